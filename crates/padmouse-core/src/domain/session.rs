//! Connection metadata and the session lifecycle state machine.
//!
//! ```text
//!   Idle ──first event / hello──▶ Active
//!    │                              │
//!    └──────── close trigger ───────┴──▶ Closing ──buttons released──▶ Closed
//! ```
//!
//! The lifecycle only records *where* a session is.  The release of held
//! buttons that gates `Closing → Closed` is performed by the server's session
//! type, which calls [`SessionLifecycle::finish_closing`] once it is done.

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use thiserror::Error;
use uuid::Uuid;

use crate::protocol::codec::DecodeFault;

/// Unique identifier assigned to every accepted connection.
pub type SessionId = Uuid;

/// One client link as seen by the listener.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: SessionId,
    pub peer: SocketAddr,
    pub created_at: Instant,
    pub last_activity: Instant,
    /// Name announced by a `Hello` record, if any.
    pub client_name: Option<String>,
}

impl Connection {
    pub fn new(peer: SocketAddr, now: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            created_at: now,
            last_activity: now,
            client_name: None,
        }
    }

    /// Records that bytes were received at `now`.
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Time since the last received bytes.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Time since the connection was accepted.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Accepted, nothing decoded yet.
    Idle,
    /// Receiving and applying events.
    Active,
    /// Teardown in progress; events are discarded.
    Closing,
    /// Terminal.
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Active => "active",
            SessionPhase::Closing => "closing",
            SessionPhase::Closed => "closed",
        })
    }
}

/// Why a session left the `Active`/`Idle` phase.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseReason {
    /// The peer closed its side of the connection (EOF).
    PeerClosed,
    /// A socket read failed.
    ReadFailed(String),
    /// The byte stream could not be decoded.
    DecodeFault(DecodeFault),
    /// The client sent an explicit `Disconnect`.
    ClientDisconnect,
    /// No bytes arrived within the idle window.
    IdleTimeout,
    /// A newer connection took over the cursor.
    Preempted,
    /// The server is shutting down.
    Shutdown,
    /// The session value was dropped without an explicit close.
    Dropped,
}

impl CloseReason {
    /// Whether the close indicates a problem rather than a normal goodbye.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            CloseReason::ReadFailed(_) | CloseReason::DecodeFault(_) | CloseReason::Dropped
        )
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => f.write_str("peer closed the connection"),
            CloseReason::ReadFailed(e) => write!(f, "read failed: {e}"),
            CloseReason::DecodeFault(fault) => write!(f, "decode fault: {fault}"),
            CloseReason::ClientDisconnect => f.write_str("client disconnected"),
            CloseReason::IdleTimeout => f.write_str("idle timeout"),
            CloseReason::Preempted => f.write_str("preempted by a newer connection"),
            CloseReason::Shutdown => f.write_str("server shutdown"),
            CloseReason::Dropped => f.write_str("session dropped"),
        }
    }
}

/// Returned when a transition is requested from the wrong phase.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid session transition {from} -> {to}")]
pub struct LifecycleError {
    pub from: SessionPhase,
    pub to: SessionPhase,
}

/// Phase tracker for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLifecycle {
    phase: SessionPhase,
    close_reason: Option<CloseReason>,
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            close_reason: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The first close trigger observed, once closing has begun.
    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.close_reason.as_ref()
    }

    /// Events are applied only in `Idle` and `Active`.
    pub fn accepts_events(&self) -> bool {
        matches!(self.phase, SessionPhase::Idle | SessionPhase::Active)
    }

    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    /// `Idle → Active`.  Returns `true` if this call made the transition;
    /// calling it while already `Active` is a no-op.
    pub fn activate(&mut self) -> Result<bool, LifecycleError> {
        match self.phase {
            SessionPhase::Idle => {
                self.phase = SessionPhase::Active;
                Ok(true)
            }
            SessionPhase::Active => Ok(false),
            from => Err(LifecycleError {
                from,
                to: SessionPhase::Active,
            }),
        }
    }

    /// `Idle | Active → Closing`.
    ///
    /// Returns `false` when closing had already begun; the first reason is
    /// kept so concurrent triggers cannot overwrite the root cause.
    pub fn begin_closing(&mut self, reason: CloseReason) -> bool {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Active => {
                self.phase = SessionPhase::Closing;
                self.close_reason = Some(reason);
                true
            }
            SessionPhase::Closing | SessionPhase::Closed => false,
        }
    }

    /// `Closing → Closed`.  Call only after every held button was released.
    pub fn finish_closing(&mut self) -> Result<(), LifecycleError> {
        match self.phase {
            SessionPhase::Closing => {
                self.phase = SessionPhase::Closed;
                Ok(())
            }
            from => Err(LifecycleError {
                from,
                to: SessionPhase::Closed,
            }),
        }
    }
}
