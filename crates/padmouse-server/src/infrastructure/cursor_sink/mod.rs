//! Cursor sink adapters.
//!
//! There is one physical cursor, so every session in the process shares a
//! single sink.  [`SerializedSink`] puts a mutex in front of it so calls from
//! concurrent sessions never interleave inside the OS layer.

pub mod mock;
mod serialized;
mod tracing_sink;

pub use serialized::SerializedSink;
pub use tracing_sink::TracingSink;
