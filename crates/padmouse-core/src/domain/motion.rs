//! Fractional-pixel accumulation.
//!
//! Touch deltas scaled by a sensitivity factor are rarely whole pixels.
//! Truncating each one independently loses up to a pixel per event, which
//! makes slow finger movement stall.  The accumulators carry the fractional
//! remainder forward and only emit whole units, so the emitted total never
//! differs from the exact total by a full unit.

/// Remainder-carrying accumulator for a single axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisAccumulator {
    remainder: f64,
}

impl AxisAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` and returns the whole units ready to emit.
    ///
    /// Whole units are taken toward zero; the fractional part (same sign as
    /// the running total) stays for the next call.
    pub fn push(&mut self, delta: f64) -> i32 {
        let total = self.remainder + delta;
        let whole = total.trunc();
        self.remainder = total - whole;
        whole.clamp(i32::MIN as f64, i32::MAX as f64) as i32
    }

    /// Fraction carried into the next call; always in `(-1.0, 1.0)`.
    pub fn remainder(&self) -> f64 {
        self.remainder
    }

    pub fn reset(&mut self) {
        self.remainder = 0.0;
    }
}

/// Two-axis accumulator for relative pointer motion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubPixelAccumulator {
    x: AxisAccumulator,
    y: AxisAccumulator,
}

impl SubPixelAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scaled delta and returns the whole-pixel displacement to apply.
    pub fn push(&mut self, dx: f64, dy: f64) -> (i32, i32) {
        (self.x.push(dx), self.y.push(dy))
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }
}
