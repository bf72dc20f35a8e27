//! Network infrastructure for the server.
//!
//! Architecture:
//! - [`ServerListener`] owns the TCP listener, decides admission for every
//!   new connection, and keeps a registry of running sessions so it can
//!   preempt them or shut them down.
//! - Each accepted connection runs in its own Tokio task built around
//!   [`drive_session`], so a stalled client never blocks the accept loop or
//!   another session.

mod connection;
mod listener;

use std::net::SocketAddr;

use padmouse_core::CloseReason;
use thiserror::Error;

pub use connection::{drive_session, SessionOutcome, READ_BUFFER_SIZE};
pub use listener::{ListenerSettings, ServerListener, ACCEPT_POLL_INTERVAL};

/// Errors that can occur in the server network layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The bound address could not be queried.
    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),
    /// Accepting a connection failed.  Not fatal to the listener.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
    /// Reading from an established connection failed (reset, aborted, ...).
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),
    /// The peer closed its side of the connection.
    #[error("connection closed by peer")]
    Closed,
}

impl TransportError {
    /// How a transport failure ends the session it happened on.
    pub fn into_close_reason(self) -> CloseReason {
        match self {
            TransportError::Closed => CloseReason::PeerClosed,
            other => CloseReason::ReadFailed(other.to_string()),
        }
    }
}
