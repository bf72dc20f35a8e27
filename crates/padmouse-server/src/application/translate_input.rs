//! InputTranslator: turns decoded pointer records into OS cursor calls.
//!
//! This use case sits at the application layer and delegates to a
//! [`CursorSink`] trait object for the actual OS call.  The translator owns
//! the only per-session input state: the down-button set and the fractional
//! remainders of moves and scrolls.
//!
//! # Button bookkeeping
//!
//! The down-button set mirrors what the sink holds pressed.  A press is only
//! recorded once the sink accepted it, and a release only clears the entry
//! once the sink accepted it, so a failed live call never makes the set lie.
//! Redundant presses and releases never reach the sink.

use std::sync::Arc;

use padmouse_core::{
    AxisAccumulator, DownButtons, MouseButton, PointerEvent, ScrollAxis, SubPixelAccumulator,
};
use thiserror::Error;
use tracing::{trace, warn};

/// Error type for cursor sink operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("operation not supported by this sink: {0}")]
    Unsupported(&'static str),
    #[error("cursor device unavailable")]
    Unavailable,
}

/// The OS cursor capability.
///
/// The only OS-touching calls in the server.  Implementations must be safe to
/// call redundantly; the translator still avoids redundant button calls.
pub trait CursorSink: Send + Sync {
    /// Moves the cursor by a whole-pixel displacement.
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), SinkError>;

    /// Moves the cursor to an absolute screen position.
    fn move_absolute(&self, x: i32, y: i32) -> Result<(), SinkError> {
        let _ = (x, y);
        Err(SinkError::Unsupported("absolute positioning"))
    }

    /// Presses or releases a button.
    fn set_button(&self, button: MouseButton, pressed: bool) -> Result<(), SinkError>;

    /// Scrolls by whole wheel notches.  Positive is up / right.
    fn scroll(&self, axis: ScrollAxis, amount: i32) -> Result<(), SinkError>;
}

/// Tunables applied to every session's translator.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatorSettings {
    /// Multiplier applied to relative moves and scrolls.
    pub sensitivity: f64,
    /// Per-event cap, in pixels, on each axis of a scaled relative move.
    pub max_step: i32,
    /// `(width, height)` used to clamp absolute moves, if known.
    pub screen_bounds: Option<(u32, u32)>,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            max_step: 1000,
            screen_bounds: None,
        }
    }
}

/// Outcome of the forced release performed during teardown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeardownReport {
    /// Buttons the sink released successfully.
    pub released: Vec<MouseButton>,
    /// Buttons whose release call failed.  Each was still attempted once.
    pub failures: Vec<(MouseButton, SinkError)>,
}

impl TeardownReport {
    /// Number of release calls issued.
    pub fn attempted(&self) -> usize {
        self.released.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Per-session translator.
pub struct InputTranslator {
    sink: Arc<dyn CursorSink>,
    settings: TranslatorSettings,
    down: DownButtons,
    motion: SubPixelAccumulator,
    scroll_vertical: AxisAccumulator,
    scroll_horizontal: AxisAccumulator,
}

impl InputTranslator {
    pub fn new(sink: Arc<dyn CursorSink>, settings: TranslatorSettings) -> Self {
        Self {
            sink,
            settings,
            down: DownButtons::new(),
            motion: SubPixelAccumulator::new(),
            scroll_vertical: AxisAccumulator::new(),
            scroll_horizontal: AxisAccumulator::new(),
        }
    }

    /// Buttons currently held on the sink by this session.
    pub fn down_buttons(&self) -> &DownButtons {
        &self.down
    }

    /// Applies one record.
    ///
    /// `Hello`, `Ping` and `Disconnect` carry no cursor action and return
    /// `Ok(())` without touching the sink; the session handles them.
    ///
    /// # Errors
    ///
    /// Returns the [`SinkError`] of the failed call.  The action is dropped
    /// and the translator state stays consistent with the sink.
    pub fn apply(&mut self, event: &PointerEvent) -> Result<(), SinkError> {
        match *event {
            PointerEvent::Move { dx, dy } => self.move_relative(dx, dy),
            PointerEvent::MoveAbsolute { x, y } => self.move_absolute(x, y),
            PointerEvent::Button { button, pressed } => {
                if pressed {
                    self.press(button)
                } else {
                    self.release(button)
                }
            }
            PointerEvent::Click { button } => self.click(button),
            PointerEvent::DoubleClick { button } => {
                self.click(button)?;
                self.click(button)
            }
            PointerEvent::Scroll { axis, amount } => self.scroll(axis, amount),
            PointerEvent::Hello { .. } | PointerEvent::Ping | PointerEvent::Disconnect => Ok(()),
        }
    }

    /// Releases every held button, each exactly once.
    ///
    /// Failures are collected, never short-circuited: every remaining button
    /// is still attempted.  The down set is empty afterwards either way, since
    /// the session is going away and nothing would retry.
    pub fn release_all(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        for button in self.down.take_all() {
            match self.sink.set_button(button, false) {
                Ok(()) => report.released.push(button),
                Err(e) => {
                    warn!("forced release of {button} failed: {e}");
                    report.failures.push((button, e));
                }
            }
        }
        self.motion.reset();
        self.scroll_vertical.reset();
        self.scroll_horizontal.reset();
        report
    }

    // ── Individual actions ────────────────────────────────────────────────────

    fn move_relative(&mut self, dx: f32, dy: f32) -> Result<(), SinkError> {
        let limit = f64::from(self.settings.max_step);
        let scaled_x = (f64::from(dx) * self.settings.sensitivity).clamp(-limit, limit);
        let scaled_y = (f64::from(dy) * self.settings.sensitivity).clamp(-limit, limit);
        let (px, py) = self.motion.push(scaled_x, scaled_y);
        if px == 0 && py == 0 {
            return Ok(());
        }
        trace!("move_relative({px}, {py})");
        self.sink.move_relative(px, py)
    }

    fn move_absolute(&mut self, x: i32, y: i32) -> Result<(), SinkError> {
        let (x, y) = match self.settings.screen_bounds {
            Some((width, height)) => (clamp_to_extent(x, width), clamp_to_extent(y, height)),
            None => (x, y),
        };
        self.motion.reset();
        trace!("move_absolute({x}, {y})");
        self.sink.move_absolute(x, y)
    }

    fn press(&mut self, button: MouseButton) -> Result<(), SinkError> {
        if self.down.is_down(button) {
            trace!("{button} already down; press ignored");
            return Ok(());
        }
        self.sink.set_button(button, true)?;
        self.down.press(button);
        Ok(())
    }

    fn release(&mut self, button: MouseButton) -> Result<(), SinkError> {
        if !self.down.is_down(button) {
            trace!("{button} not down; release ignored");
            return Ok(());
        }
        // Stays in the set on failure so teardown retries it.
        self.sink.set_button(button, false)?;
        self.down.release(button);
        Ok(())
    }

    fn click(&mut self, button: MouseButton) -> Result<(), SinkError> {
        self.press(button)?;
        self.release(button)
    }

    fn scroll(&mut self, axis: ScrollAxis, amount: f32) -> Result<(), SinkError> {
        let scaled = f64::from(amount) * self.settings.sensitivity;
        let notches = match axis {
            ScrollAxis::Vertical => self.scroll_vertical.push(scaled),
            ScrollAxis::Horizontal => self.scroll_horizontal.push(scaled),
        };
        if notches == 0 {
            return Ok(());
        }
        trace!("scroll({axis:?}, {notches})");
        self.sink.scroll(axis, notches)
    }
}

fn clamp_to_extent(value: i32, extent: u32) -> i32 {
    let max = i32::try_from(extent.saturating_sub(1)).unwrap_or(i32::MAX);
    value.clamp(0, max)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
