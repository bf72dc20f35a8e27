//! padmouse-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the server do?
//!
//! A phone or tablet running the companion app connects over TCP and streams
//! pointer records: relative moves from the touch surface, button changes,
//! clicks, and scroll gestures.  The server:
//!
//! 1. Accepts the connection and applies the session policy (preempt the
//!    current owner of the cursor, reject the newcomer, or serve both).
//! 2. Decodes the byte stream incrementally, whatever the read boundaries.
//! 3. Applies each record, in order, to the OS cursor through a
//!    [`CursorSink`](application::translate_input::CursorSink).
//! 4. On disconnect, decode failure, idle timeout, or preemption, releases
//!    every button the session still holds so the desktop is never left with
//!    a stuck drag.

/// Application layer: translation, per-session state, admission policy.
pub mod application;

/// Infrastructure layer: sockets, cursor sinks, status, configuration.
pub mod infrastructure;
