//! Recording cursor sink for tests.
//!
//! A real sink moves the pointer on the machine running the tests and cannot
//! be observed from Rust.  [`RecordingSink`] keeps every call in order in a
//! `Mutex<Vec<SinkCall>>` so assertions can inspect exactly what was issued.
//!
//! Failed calls are recorded too: a call log of *attempts* is what the
//! "every held button is released exactly once" checks need.
//!
//! # Failure injection
//!
//! [`RecordingSink::set_fail_all`] makes every call return
//! [`SinkError::Platform`]; [`RecordingSink::set_fail_releases`] only fails
//! button releases, which is the path teardown must survive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use padmouse_core::{MouseButton, ScrollAxis};

use crate::application::translate_input::{CursorSink, SinkError};

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    MoveRelative { dx: i32, dy: i32 },
    MoveAbsolute { x: i32, y: i32 },
    SetButton { button: MouseButton, pressed: bool },
    Scroll { axis: ScrollAxis, amount: i32 },
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    fail_all: AtomicBool,
    fail_releases: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the calls received so far, in order.
    pub fn calls(&self) -> Vec<SinkCall> {
        self.lock().clone()
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_releases(&self, fail: bool) {
        self.fail_releases.store(fail, Ordering::SeqCst);
    }

    /// Number of `set_button(button, true)` calls.
    pub fn press_count(&self, button: MouseButton) -> usize {
        self.button_calls(button, true)
    }

    /// Number of `set_button(button, false)` calls.
    pub fn release_count(&self, button: MouseButton) -> usize {
        self.button_calls(button, false)
    }

    /// Buttons pressed more often than released, i.e. still held.
    pub fn held_buttons(&self) -> Vec<MouseButton> {
        [MouseButton::Left, MouseButton::Right, MouseButton::Middle]
            .into_iter()
            .filter(|&b| self.press_count(b) > self.release_count(b))
            .collect()
    }

    fn button_calls(&self, button: MouseButton, pressed: bool) -> usize {
        self.lock()
            .iter()
            .filter(|c| **c == SinkCall::SetButton { button, pressed })
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SinkCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: SinkCall) -> Result<(), SinkError> {
        self.lock().push(call);
        let is_release = matches!(call, SinkCall::SetButton { pressed: false, .. });
        if self.fail_all.load(Ordering::SeqCst)
            || (is_release && self.fail_releases.load(Ordering::SeqCst))
        {
            return Err(SinkError::Platform("mock failure".into()));
        }
        Ok(())
    }
}

impl CursorSink for RecordingSink {
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), SinkError> {
        self.record(SinkCall::MoveRelative { dx, dy })
    }

    fn move_absolute(&self, x: i32, y: i32) -> Result<(), SinkError> {
        self.record(SinkCall::MoveAbsolute { x, y })
    }

    fn set_button(&self, button: MouseButton, pressed: bool) -> Result<(), SinkError> {
        self.record(SinkCall::SetButton { button, pressed })
    }

    fn scroll(&self, axis: ScrollAxis, amount: i32) -> Result<(), SinkError> {
        self.record(SinkCall::Scroll { axis, amount })
    }
}
