use std::sync::atomic::{AtomicU64, Ordering};

use padmouse_core::{MouseButton, ScrollAxis};
use tracing::debug;

use crate::application::translate_input::{CursorSink, SinkError};

/// Sink that logs every cursor action instead of performing it.
///
/// Used by the binary until an OS-backed sink is plugged in, and handy for
/// watching what a companion app actually sends (`RUST_LOG=padmouse=debug`).
#[derive(Debug, Default)]
pub struct TracingSink {
    calls: AtomicU64,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

impl CursorSink for TracingSink {
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), SinkError> {
        self.count();
        debug!(target: "padmouse::cursor", "move by ({dx}, {dy})");
        Ok(())
    }

    fn move_absolute(&self, x: i32, y: i32) -> Result<(), SinkError> {
        self.count();
        debug!(target: "padmouse::cursor", "move to ({x}, {y})");
        Ok(())
    }

    fn set_button(&self, button: MouseButton, pressed: bool) -> Result<(), SinkError> {
        self.count();
        let action = if pressed { "press" } else { "release" };
        debug!(target: "padmouse::cursor", "{action} {button}");
        Ok(())
    }

    fn scroll(&self, axis: ScrollAxis, amount: i32) -> Result<(), SinkError> {
        self.count();
        debug!(target: "padmouse::cursor", "scroll {axis:?} by {amount}");
        Ok(())
    }
}
