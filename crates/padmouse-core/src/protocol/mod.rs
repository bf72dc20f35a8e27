//! Protocol module containing the event records, the binary codec, the legacy
//! JSON-lines parser, and the buffering frame decoder.

pub mod codec;
pub mod decoder;
pub mod json_lines;
pub mod messages;

pub use codec::{decode_frame, encode_frame, DecodeFault, EncodeError};
pub use decoder::{DecodedBatch, FrameDecoder, WireFormat};
pub use messages::*;
