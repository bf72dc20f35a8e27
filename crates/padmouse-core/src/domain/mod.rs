//! Domain layer: pure session bookkeeping with no I/O.
//!
//! - **`session`** – connection metadata and the `Idle → Active → Closing →
//!   Closed` lifecycle.
//! - **`buttons`** – the set of buttons currently held down on the host.
//! - **`motion`** – fractional-pixel accumulation for moves and scrolls.

pub mod buttons;
pub mod motion;
pub mod session;
