//! Admission policy for new connections.
//!
//! Two uncoordinated clients driving one cursor produce erratic motion, so by
//! default the newest connection takes over: a phone that lost Wi-Fi and
//! reconnects should not be locked out by its own stale session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What to do with a connection that arrives while sessions are active.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPolicy {
    /// Tear down every active session, then serve the newcomer.
    #[default]
    Preempt,
    /// Close the newcomer immediately.
    RejectNew,
    /// Serve everyone; sink calls are serialised.
    Concurrent,
}

impl fmt::Display for SessionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionPolicy::Preempt => "preempt",
            SessionPolicy::RejectNew => "reject-new",
            SessionPolicy::Concurrent => "concurrent",
        })
    }
}

/// Decision for one incoming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Serve it alongside whatever is active.
    Accept,
    /// Serve it once every active session has finished its teardown.
    AcceptAfterPreempting,
    /// Close it without reading.
    Reject,
}

/// Applies `policy` given the number of currently active sessions.
pub fn admit(policy: SessionPolicy, active_sessions: usize) -> Admission {
    if active_sessions == 0 {
        return Admission::Accept;
    }
    match policy {
        SessionPolicy::Preempt => Admission::AcceptAfterPreempting,
        SessionPolicy::RejectNew => Admission::Reject,
        SessionPolicy::Concurrent => Admission::Accept,
    }
}
