//! Application layer use cases for the server.
//!
//! - **`translate_input`** – Maps decoded pointer records onto the
//!   [`CursorSink`](translate_input::CursorSink) capability, applying
//!   sensitivity, step clamping, and sub-pixel accumulation, and tracks the
//!   buttons held down so they can be released on teardown.
//!
//! - **`session`** – Ties one connection's decoder, lifecycle, and translator
//!   together.  Bytes go in; sink calls and close decisions come out.
//!
//! - **`admission`** – Decides what happens to a new connection while others
//!   are active.

pub mod admission;
pub mod session;
pub mod translate_input;
