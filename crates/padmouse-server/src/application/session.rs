//! Session: one connection's decode and translation state.
//!
//! A [`Session`] is created when a client connects and owns everything that
//! belongs to that client: the [`Connection`] record, the lifecycle, the
//! [`FrameDecoder`] holding the raw buffer, and the [`InputTranslator`]
//! holding the down-button set.  The network task feeds it bytes with
//! [`Session::ingest`] and ends it with [`Session::close`].
//!
//! Teardown always releases held buttons before the lifecycle reaches
//! `Closed`, whatever the trigger.  If a `Session` is dropped without being
//! closed (e.g. its task panicked) the `Drop` impl performs the same release.

use std::net::SocketAddr;
use std::time::Instant;

use padmouse_core::{
    CloseReason, Connection, FrameDecoder, PointerEvent, SessionId, SessionLifecycle,
    SessionPhase, WireFormat,
};
use tracing::{debug, info, trace, warn};

use crate::application::translate_input::{InputTranslator, TeardownReport};

/// What the caller should do after [`Session::ingest`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStep {
    /// Keep reading.
    Continue,
    /// Stop reading and call [`Session::close`]; the session is `Closing`.
    Close(CloseReason),
}

pub struct Session {
    connection: Connection,
    lifecycle: SessionLifecycle,
    decoder: FrameDecoder,
    translator: InputTranslator,
    events_applied: u64,
}

impl Session {
    pub fn new(connection: Connection, format: WireFormat, translator: InputTranslator) -> Self {
        debug!(
            "session {} created for {} ({format} framing)",
            connection.id, connection.peer
        );
        Self {
            connection,
            lifecycle: SessionLifecycle::new(),
            decoder: FrameDecoder::new(format),
            translator,
            events_applied: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.connection.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.connection.peer
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn phase(&self) -> SessionPhase {
        self.lifecycle.phase()
    }

    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.lifecycle.close_reason()
    }

    pub fn translator(&self) -> &InputTranslator {
        &self.translator
    }

    /// Records applied so far, control records included.
    pub fn events_applied(&self) -> u64 {
        self.events_applied
    }

    /// Feeds newly read bytes through the decoder and applies every complete
    /// record in wire order.
    ///
    /// Stops at the first close trigger (explicit `Disconnect` or a decode
    /// fault): the session moves to `Closing` and anything after the trigger
    /// is discarded.  Bytes arriving once closing has begun are ignored.
    pub fn ingest(&mut self, bytes: &[u8], now: Instant) -> SessionStep {
        if !self.lifecycle.accepts_events() {
            trace!(
                "session {}: discarding {} bytes after teardown began",
                self.connection.id,
                bytes.len()
            );
            return SessionStep::Close(
                self.lifecycle
                    .close_reason()
                    .cloned()
                    .unwrap_or(CloseReason::Dropped),
            );
        }

        self.connection.touch(now);
        let batch = self.decoder.feed(bytes);

        for event in batch.events {
            if let Some(reason) = self.apply(event) {
                return self.begin_closing(reason);
            }
        }

        match batch.fault {
            Some(fault) => {
                warn!(
                    "session {} ({}): {fault}; closing",
                    self.connection.id, self.connection.peer
                );
                self.begin_closing(CloseReason::DecodeFault(fault))
            }
            None => SessionStep::Continue,
        }
    }

    /// Tears the session down: `Closing`, forced release, `Closed`.
    ///
    /// If closing already began (from [`ingest`](Self::ingest)) the original
    /// reason is kept.  Calling `close` on a closed session does nothing.
    pub fn close(&mut self, reason: CloseReason) -> TeardownReport {
        if self.lifecycle.is_closed() {
            return TeardownReport::default();
        }
        self.lifecycle.begin_closing(reason);

        let report = self.translator.release_all();
        if let Err(e) = self.lifecycle.finish_closing() {
            warn!("session {}: {e}", self.connection.id);
        }

        let reason = self
            .lifecycle
            .close_reason()
            .map(ToString::to_string)
            .unwrap_or_default();
        info!(
            "session {} ({}) closed: {reason}; released {} button(s), {} failed, {} events in {:.1?}",
            self.connection.id,
            self.connection.peer,
            report.released.len(),
            report.failures.len(),
            self.events_applied,
            self.connection.age(Instant::now()),
        );
        report
    }

    fn begin_closing(&mut self, reason: CloseReason) -> SessionStep {
        self.lifecycle.begin_closing(reason.clone());
        SessionStep::Close(reason)
    }

    /// Applies one record; returns a close reason if the record ends the
    /// session.
    fn apply(&mut self, event: PointerEvent) -> Option<CloseReason> {
        match self.lifecycle.activate() {
            Ok(true) => info!(
                "session {} ({}) active",
                self.connection.id, self.connection.peer
            ),
            Ok(false) => {}
            Err(e) => {
                warn!("session {}: {e}", self.connection.id);
                return None;
            }
        }
        self.events_applied += 1;

        match event {
            PointerEvent::Hello { client_name } => {
                info!(
                    "session {}: client '{client_name}' says hello",
                    self.connection.id
                );
                self.connection.client_name = Some(client_name);
                None
            }
            PointerEvent::Ping => {
                trace!("session {}: ping", self.connection.id);
                None
            }
            PointerEvent::Disconnect => Some(CloseReason::ClientDisconnect),
            other => {
                trace!("session {}: {}", self.connection.id, other.name());
                if let Err(e) = self.translator.apply(&other) {
                    warn!(
                        "session {}: {} dropped: {e}",
                        self.connection.id,
                        other.name()
                    );
                }
                None
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.lifecycle.is_closed() {
            warn!(
                "session {} dropped in phase {}; forcing teardown",
                self.connection.id,
                self.lifecycle.phase()
            );
            self.close(CloseReason::Dropped);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
