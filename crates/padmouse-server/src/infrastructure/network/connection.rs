//! Per-connection read task.
//!
//! Reads are the only place a session suspends.  Decoding and translation of
//! a chunk run synchronously between two reads, so a cancel signal
//! (preemption or shutdown) is only ever observed at a read boundary and
//! teardown never overlaps an in-flight translation.

use std::time::Duration;

use padmouse_core::CloseReason;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::oneshot;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::application::session::{Session, SessionStep};
use crate::application::translate_input::TeardownReport;
use crate::infrastructure::network::TransportError;

/// Size of the per-connection read buffer.  Frames are at most 68 bytes.
pub const READ_BUFFER_SIZE: usize = 4096;

/// How a driven session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    /// The first close trigger.
    pub reason: CloseReason,
    /// Result of the forced release.
    pub report: TeardownReport,
}

/// Reads from `reader` into `session` until something ends the session, then
/// tears it down.
///
/// The session ends on EOF, a read error, a decode fault, an explicit
/// `Disconnect`, `idle_timeout` elapsing without any bytes, or a reason
/// arriving on `cancel`.  A dropped `cancel` sender counts as shutdown.
/// On return the session is `Closed` and all its buttons were released.
pub async fn drive_session<R>(
    session: &mut Session,
    reader: &mut R,
    idle_timeout: Duration,
    mut cancel: oneshot::Receiver<CloseReason>,
) -> SessionOutcome
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut deadline = idle_deadline(idle_timeout);

    let trigger = loop {
        let read = tokio::select! {
            biased;
            signal = &mut cancel => break signal.unwrap_or(CloseReason::Shutdown),
            read = time::timeout_at(deadline, reader.read(&mut buf)) => read,
        };

        match read {
            Err(_elapsed) => {
                debug!(
                    "session {}: no bytes for {idle_timeout:?}",
                    session.id()
                );
                break CloseReason::IdleTimeout;
            }
            Ok(Ok(0)) => break TransportError::Closed.into_close_reason(),
            Ok(Ok(n)) => {
                deadline = idle_deadline(idle_timeout);
                if let SessionStep::Close(reason) =
                    session.ingest(&buf[..n], std::time::Instant::now())
                {
                    break reason;
                }
            }
            Ok(Err(e)) => break TransportError::Read(e).into_close_reason(),
        }
    };

    let report = session.close(trigger.clone());
    let reason = session.close_reason().cloned().unwrap_or(trigger);
    SessionOutcome { reason, report }
}

/// `now + idle_timeout`, saturating at a far-future deadline instead of
/// overflowing.
fn idle_deadline(idle_timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(idle_timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Roughly thirty years; what tokio itself uses for "never".
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

// ── Tests ─────────────────────────────────────────────────────────────────────
