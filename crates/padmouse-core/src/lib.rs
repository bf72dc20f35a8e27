//! # padmouse-core
//!
//! Shared library for the padmouse pointer server containing the wire
//! protocol, the incremental frame decoder, and the per-session domain types.
//!
//! It has zero dependencies on OS APIs or network sockets, so everything here
//! can be driven from unit tests with plain byte slices.
//!
//! # Architecture overview
//!
//! A handheld device connects to the desktop over TCP and streams small
//! pointer records (move, button, scroll, ping).  The desktop server turns
//! them into cursor actions.  This crate covers the parts of that pipeline
//! that do not touch the OS:
//!
//! - **`protocol`** – How bytes travel over the network.  Binary frames carry
//!   a 4-byte header (version, kind, payload length) followed by a fixed-shape
//!   payload.  The legacy newline-delimited JSON format used by older builds
//!   of the companion app is accepted too.  [`FrameDecoder`] owns the per
//!   connection byte buffer and turns arbitrary read chunks into an ordered
//!   sequence of [`PointerEvent`]s.
//!
//! - **`domain`** – Session bookkeeping with no I/O: the connection lifecycle
//!   state machine, the set of buttons currently held down, and the sub-pixel
//!   motion accumulator.

pub mod domain;
pub mod protocol;

pub use domain::buttons::DownButtons;
pub use domain::motion::{AxisAccumulator, SubPixelAccumulator};
pub use domain::session::{
    CloseReason, Connection, LifecycleError, SessionId, SessionLifecycle, SessionPhase,
};
pub use protocol::codec::{decode_frame, encode_frame, DecodeFault, EncodeError};
pub use protocol::decoder::{DecodedBatch, FrameDecoder, WireFormat};
pub use protocol::messages::{MouseButton, PointerEvent, ScrollAxis};
