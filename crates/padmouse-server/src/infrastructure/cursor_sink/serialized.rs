use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use padmouse_core::{MouseButton, ScrollAxis};

use crate::application::translate_input::{CursorSink, SinkError};

/// Serialises every call into the wrapped sink and arbitrates button state
/// between sessions that share it.
///
/// Each session tracks only its own held buttons, so the sink keeps a hold
/// count per button.  A press reaches the inner sink only when the count
/// leaves zero and a release only when it returns to zero; a session that
/// lets go of a button another session still holds does not release it.
///
/// A poisoned lock (a panic while another session held it) is recovered
/// rather than propagated; the counts are only written after the inner call
/// returns.
pub struct SerializedSink {
    inner: Mutex<Shared>,
}

struct Shared {
    sink: Arc<dyn CursorSink>,
    holds: BTreeMap<MouseButton, u32>,
}

impl SerializedSink {
    pub fn new(inner: Arc<dyn CursorSink>) -> Self {
        Self {
            inner: Mutex::new(Shared {
                sink: inner,
                holds: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with<T>(&self, f: impl FnOnce(&dyn CursorSink) -> T) -> T {
        let guard = self.lock();
        f(guard.sink.as_ref())
    }
}

impl CursorSink for SerializedSink {
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), SinkError> {
        self.with(|s| s.move_relative(dx, dy))
    }

    fn move_absolute(&self, x: i32, y: i32) -> Result<(), SinkError> {
        self.with(|s| s.move_absolute(x, y))
    }

    fn set_button(&self, button: MouseButton, pressed: bool) -> Result<(), SinkError> {
        let mut shared = self.lock();
        let held = shared.holds.get(&button).copied().unwrap_or(0);

        if pressed {
            if held == 0 {
                shared.sink.set_button(button, true)?;
            }
            shared.holds.insert(button, held + 1);
            return Ok(());
        }

        // The count drops even when the release fails: the caller either
        // forgets the button (teardown) or retries, and a retry at zero is
        // forwarded again.
        let remaining = held.saturating_sub(1);
        if remaining == 0 {
            shared.holds.remove(&button);
            shared.sink.set_button(button, false)
        } else {
            shared.holds.insert(button, remaining);
            Ok(())
        }
    }

    fn scroll(&self, axis: ScrollAxis, amount: i32) -> Result<(), SinkError> {
        self.with(|s| s.scroll(axis, amount))
    }
}
