//! TCP accept loop and session registry.
//!
//! This module is responsible for:
//!
//! 1. Binding the TCP listener on the configured address.
//! 2. Applying the [`SessionPolicy`] to each incoming connection.
//! 3. Spawning one Tokio task per admitted connection.
//! 4. Preempting or shutting down running sessions through their cancel
//!    signal, and waiting until their teardown has finished.
//! 5. Publishing [`ServerStatus`] changes.
//!
//! The accept loop never awaits session work.  Under `preempt`, waiting for
//! the displaced sessions' teardown happens inside the new session's task,
//! before it reads its first byte, so the old owner's buttons are always
//! released before the new owner's events reach the sink.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use padmouse_core::{CloseReason, Connection, SessionId, WireFormat};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::application::admission::{admit, Admission, SessionPolicy};
use crate::application::session::Session;
use crate::application::translate_input::{CursorSink, InputTranslator, TranslatorSettings};
use crate::infrastructure::cursor_sink::SerializedSink;
use crate::infrastructure::network::connection::drive_session;
use crate::infrastructure::network::TransportError;
use crate::infrastructure::status::{ServerStatus, StatusPublisher};

/// How often the accept loop re-checks the `running` flag when idle.
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Everything a session task needs besides its socket.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerSettings {
    pub policy: SessionPolicy,
    pub idle_timeout: Duration,
    pub wire_format: WireFormat,
    pub translator: TranslatorSettings,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            policy: SessionPolicy::default(),
            idle_timeout: Duration::from_secs(30),
            wire_format: WireFormat::default(),
            translator: TranslatorSettings::default(),
        }
    }
}

// ── Session registry ──────────────────────────────────────────────────────────

/// Listener-side handle to a running session task.
#[derive(Debug)]
struct SessionHandle {
    peer: SocketAddr,
    /// Asks the task to close with the given reason.
    cancel: oneshot::Sender<CloseReason>,
    /// Resolves (with an error) once the task has finished its teardown.
    done: oneshot::Receiver<()>,
}

#[derive(Debug, Default)]
struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    /// Registers a session and returns the new number of sessions.
    fn insert(&self, id: SessionId, handle: SessionHandle) -> usize {
        let mut sessions = self.lock();
        sessions.insert(id, handle);
        sessions.len()
    }

    /// Forgets a session and returns the number left.  Unknown ids are fine:
    /// preempted sessions were already taken out by [`drain`](Self::drain).
    fn remove(&self, id: &SessionId) -> usize {
        let mut sessions = self.lock();
        sessions.remove(id);
        sessions.len()
    }

    fn drain(&self) -> Vec<(SessionId, SessionHandle)> {
        self.lock().drain().collect()
    }
}

/// Sends `reason` to every handle and returns their completion signals.
fn cancel_all(
    handles: Vec<(SessionId, SessionHandle)>,
    reason: &CloseReason,
) -> Vec<oneshot::Receiver<()>> {
    handles
        .into_iter()
        .map(|(id, handle)| {
            debug!("signalling session {id} ({}): {reason}", handle.peer);
            // A send error means the task already finished on its own.
            let _ = handle.cancel.send(reason.clone());
            handle.done
        })
        .collect()
}

async fn wait_all(done: Vec<oneshot::Receiver<()>>) {
    for signal in done {
        let _ = signal.await;
    }
}

// ── Listener ──────────────────────────────────────────────────────────────────

struct Shared {
    settings: ListenerSettings,
    sink: Arc<dyn CursorSink>,
    registry: SessionRegistry,
    status: StatusPublisher,
}

/// Accepts pointer clients and runs one session task per admitted connection.
pub struct ServerListener {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl ServerListener {
    /// Binds `addr`.  All sessions share `sink` through a [`SerializedSink`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] if the port is in use or the process
    /// lacks permission to bind it.
    pub async fn bind(
        addr: SocketAddr,
        settings: ListenerSettings,
        sink: Arc<dyn CursorSink>,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        let sink: Arc<dyn CursorSink> = Arc::new(SerializedSink::new(sink));
        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                settings,
                sink,
                registry: SessionRegistry::default(),
                status: StatusPublisher::new(),
            }),
        })
    }

    /// The bound address; useful after binding port 0.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::LocalAddr`] if the OS query fails.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener.local_addr().map_err(TransportError::LocalAddr)
    }

    /// Subscribes to status snapshots.
    pub fn status(&self) -> watch::Receiver<ServerStatus> {
        self.shared.status.subscribe()
    }

    pub fn active_sessions(&self) -> usize {
        self.shared.registry.len()
    }

    /// Runs the accept loop until `running` is cleared, then shuts every
    /// session down and waits for their teardown.
    pub async fn run(self, running: Arc<AtomicBool>) {
        match self.local_addr() {
            Ok(addr) => info!(
                "listening on {addr} (policy {}, idle timeout {:?}, {} framing)",
                self.shared.settings.policy,
                self.shared.settings.idle_timeout,
                self.shared.settings.wire_format
            ),
            Err(e) => warn!("{e}"),
        }

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            // Short timeout so the flag is re-checked while nobody connects.
            match timeout(ACCEPT_POLL_INTERVAL, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => self.handle_incoming(stream, peer),
                Ok(Err(e)) => error!("{}", TransportError::Accept(e)),
                Err(_) => {}
            }
        }

        self.shutdown().await;
    }

    fn handle_incoming(&self, stream: TcpStream, peer: SocketAddr) {
        let shared = &self.shared;
        let displaced = match admit(shared.settings.policy, shared.registry.len()) {
            Admission::Reject => {
                warn!("rejecting {peer}: a session is already active");
                shared.status.connection_rejected(peer);
                drop(stream);
                return;
            }
            Admission::Accept => Vec::new(),
            Admission::AcceptAfterPreempting => {
                let handles = shared.registry.drain();
                info!("{peer} preempts {} active session(s)", handles.len());
                cancel_all(handles, &CloseReason::Preempted)
            }
        };

        let connection = Connection::new(peer, std::time::Instant::now());
        let id = connection.id;
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let active = shared.registry.insert(
            id,
            SessionHandle {
                peer,
                cancel: cancel_tx,
                done: done_rx,
            },
        );
        shared.status.session_started(peer, active);
        info!("accepted {peer} as session {id}");

        let registration = Registration {
            shared: Arc::clone(shared),
            id,
            close: None,
            _done: done_tx,
        };
        tokio::spawn(run_connection(registration, stream, connection, cancel_rx, displaced));
    }

    async fn shutdown(&self) {
        let handles = self.shared.registry.drain();
        if !handles.is_empty() {
            info!("closing {} active session(s)", handles.len());
        }
        wait_all(cancel_all(handles, &CloseReason::Shutdown)).await;
        self.shared.status.stopped();
        info!("listener stopped");
    }
}

/// Keeps a session task registered; deregisters and publishes status when
/// dropped, including on panic.  Dropping `_done` wakes whoever waits for
/// this session's teardown.
struct Registration {
    shared: Arc<Shared>,
    id: SessionId,
    close: Option<String>,
    _done: oneshot::Sender<()>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let remaining = self.shared.registry.remove(&self.id);
        let close = self
            .close
            .take()
            .unwrap_or_else(|| "session task ended unexpectedly".to_string());
        self.shared.status.session_ended(close, remaining);
    }
}

async fn run_connection(
    mut registration: Registration,
    mut stream: TcpStream,
    connection: Connection,
    cancel: oneshot::Receiver<CloseReason>,
    displaced: Vec<oneshot::Receiver<()>>,
) {
    // The previous owner must release its buttons before we touch the sink.
    wait_all(displaced).await;

    let shared = Arc::clone(&registration.shared);
    let translator =
        InputTranslator::new(Arc::clone(&shared.sink), shared.settings.translator.clone());
    let mut session = Session::new(connection, shared.settings.wire_format, translator);

    let outcome =
        drive_session(&mut session, &mut stream, shared.settings.idle_timeout, cancel).await;
    drop(session);

    registration.close = Some(outcome.reason.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn handle() -> (SessionHandle, oneshot::Receiver<CloseReason>, oneshot::Sender<()>) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        (
            SessionHandle {
                peer: "127.0.0.1:1".parse().unwrap(),
                cancel: cancel_tx,
                done: done_rx,
            },
            cancel_rx,
            done_tx,
        )
    }

    #[test]
    fn test_registry_counts_inserts_and_removals() {
        // Arrange
        let registry = SessionRegistry::default();
        let (a, _, _) = handle();
        let (b, _, _) = handle();
        let (id_a, id_b) = (Uuid::new_v4(), Uuid::new_v4());

        // Act / Assert
        assert_eq!(registry.insert(id_a, a), 1);
        assert_eq!(registry.insert(id_b, b), 2);
        assert_eq!(registry.remove(&id_a), 1);
        assert_eq!(registry.remove(&id_a), 1);
        assert_eq!(registry.drain().len(), 1);
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_delivers_reason_and_returns_done_signals() {
        // Arrange
        let (h, mut cancel_rx, done_tx) = handle();

        // Act
        let done = cancel_all(vec![(Uuid::new_v4(), h)], &CloseReason::Preempted);

        // Assert
        assert_eq!(cancel_rx.try_recv(), Ok(CloseReason::Preempted));
        drop(done_tx);
        wait_all(done).await;
    }

    #[tokio::test]
    async fn test_cancel_all_tolerates_finished_sessions() {
        let (h, cancel_rx, done_tx) = handle();
        drop(cancel_rx);
        drop(done_tx);

        let done = cancel_all(vec![(Uuid::new_v4(), h)], &CloseReason::Shutdown);

        wait_all(done).await;
    }

    #[tokio::test]
    async fn test_bind_on_port_zero_reports_real_port() {
        let listener = ServerListener::bind(
            "127.0.0.1:0".parse().unwrap(),
            ListenerSettings::default(),
            Arc::new(crate::infrastructure::cursor_sink::TracingSink::new()),
        )
        .await
        .unwrap();

        assert_ne!(listener.local_addr().unwrap().port(), 0);
        assert_eq!(listener.active_sessions(), 0);
    }
}
