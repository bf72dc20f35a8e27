//! Server status snapshots.
//!
//! The listener publishes a [`ServerStatus`] on a `tokio::sync::watch`
//! channel whenever a session starts or ends.  Watchers only ever see the
//! latest snapshot, which is all a status display needs.

use std::fmt;
use std::net::SocketAddr;

use tokio::sync::watch;

/// Coarse server state, as a desktop status indicator would show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    /// Bound and waiting for a client.
    #[default]
    Listening,
    /// At least one session is being served.
    Active,
    /// The accept loop has exited.
    Stopped,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerState::Listening => "listening",
            ServerState::Active => "active",
            ServerState::Stopped => "stopped",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerStatus {
    pub state: ServerState,
    pub active_sessions: usize,
    /// Peer of the most recently accepted connection.
    pub last_peer: Option<SocketAddr>,
    /// Description of how the most recent session ended.
    pub last_close: Option<String>,
    /// Connections refused by the `reject-new` policy.
    pub rejected_connections: u64,
}

impl ServerStatus {
    fn with_sessions(&mut self, active: usize) {
        self.active_sessions = active;
        if self.state != ServerState::Stopped {
            self.state = if active > 0 {
                ServerState::Active
            } else {
                ServerState::Listening
            };
        }
    }
}

/// Publishing side of the status channel, owned by the listener.
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    tx: watch::Sender<ServerStatus>,
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ServerStatus::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ServerStatus {
        self.tx.borrow().clone()
    }

    pub fn session_started(&self, peer: SocketAddr, active: usize) {
        self.tx.send_modify(|s| {
            s.last_peer = Some(peer);
            s.with_sessions(active);
        });
    }

    pub fn session_ended(&self, close: String, active: usize) {
        self.tx.send_modify(|s| {
            s.last_close = Some(close);
            s.with_sessions(active);
        });
    }

    pub fn connection_rejected(&self, peer: SocketAddr) {
        self.tx.send_modify(|s| {
            s.last_peer = Some(peer);
            s.rejected_connections += 1;
        });
    }

    pub fn stopped(&self) {
        self.tx.send_modify(|s| {
            s.state = ServerState::Stopped;
            s.active_sessions = 0;
        });
    }
}
