//! Buffering frame decoder.
//!
//! A [`FrameDecoder`] owns the raw byte buffer of one connection.  Each call
//! to [`FrameDecoder::feed`] appends the newly read bytes and returns every
//! event that is now complete, in wire order.  Bytes belonging to a frame that
//! is still incomplete stay buffered for the next call, so the same stream
//! decodes to the same events however the network chunks it.
//!
//! A fault is terminal.  Events decoded *before* the faulty frame in the same
//! call are still returned (they arrived intact and in order), the buffer is
//! discarded, and every later call reports [`DecodeFault::Faulted`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::protocol::codec::{decode_frame, DecodeFault};
use crate::protocol::json_lines::{decode_line, MAX_LINE_LEN};
use crate::protocol::messages::{PointerEvent, PROTOCOL_VERSION};

/// Which framing the connection speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireFormat {
    /// Decide from the first byte of the connection.
    #[default]
    Auto,
    /// Binary frames (see [`crate::protocol::codec`]).
    Binary,
    /// Newline-delimited JSON (see [`crate::protocol::json_lines`]).
    JsonLines,
}

/// Error returned when parsing a [`WireFormat`] from text.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("unknown wire format '{0}' (expected auto, binary or json-lines)")]
pub struct UnknownWireFormat(pub String);

impl FromStr for WireFormat {
    type Err = UnknownWireFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(WireFormat::Auto),
            "binary" => Ok(WireFormat::Binary),
            "json-lines" => Ok(WireFormat::JsonLines),
            other => Err(UnknownWireFormat(other.to_string())),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WireFormat::Auto => "auto",
            WireFormat::Binary => "binary",
            WireFormat::JsonLines => "json-lines",
        })
    }
}

/// Result of one [`FrameDecoder::feed`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBatch {
    /// Complete events in wire order.
    pub events: Vec<PointerEvent>,
    /// Set when the stream can no longer be decoded.
    pub fault: Option<DecodeFault>,
}

/// Decodes every complete record at the front of `buffer`.
///
/// Returns the events, the number of bytes they occupied, and the fault that
/// stopped decoding, if any.  `format` must already be resolved (not `Auto`).
pub fn decode_buffer(
    format: WireFormat,
    buffer: &[u8],
) -> (Vec<PointerEvent>, usize, Option<DecodeFault>) {
    match format {
        WireFormat::Binary | WireFormat::Auto => decode_binary(buffer),
        WireFormat::JsonLines => decode_json_lines(buffer),
    }
}

fn decode_binary(buffer: &[u8]) -> (Vec<PointerEvent>, usize, Option<DecodeFault>) {
    let mut events = Vec::new();
    let mut offset = 0;
    loop {
        match decode_frame(&buffer[offset..]) {
            Ok(Some((event, consumed))) => {
                events.push(event);
                offset += consumed;
            }
            Ok(None) => return (events, offset, None),
            Err(fault) => return (events, offset, Some(fault)),
        }
    }
}

fn decode_json_lines(buffer: &[u8]) -> (Vec<PointerEvent>, usize, Option<DecodeFault>) {
    let mut events = Vec::new();
    let mut offset = 0;
    loop {
        let rest = &buffer[offset..];
        let Some(newline) = rest.iter().position(|&b| b == b'\n') else {
            let fault = (rest.len() > MAX_LINE_LEN).then_some(DecodeFault::LineTooLong {
                limit: MAX_LINE_LEN,
            });
            return (events, offset, fault);
        };
        if newline > MAX_LINE_LEN {
            return (
                events,
                offset,
                Some(DecodeFault::LineTooLong {
                    limit: MAX_LINE_LEN,
                }),
            );
        }
        match decode_line(&rest[..newline]) {
            Ok(mut decoded) => {
                events.append(&mut decoded);
                offset += newline + 1;
            }
            Err(fault) => return (events, offset, Some(fault)),
        }
    }
}

/// Per-connection decoder that owns the raw byte buffer.
#[derive(Debug)]
pub struct FrameDecoder {
    format: WireFormat,
    buffer: Vec<u8>,
    faulted: bool,
}

impl FrameDecoder {
    /// Creates a decoder for `format`.  `Auto` resolves on the first byte fed.
    pub fn new(format: WireFormat) -> Self {
        Self {
            format,
            buffer: Vec::new(),
            faulted: false,
        }
    }

    /// The framing in effect.  Still `Auto` until the first byte arrives.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Bytes held back because they do not form a complete record yet.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a fault has been reported.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Appends `bytes` and decodes all records that are now complete.
    pub fn feed(&mut self, bytes: &[u8]) -> DecodedBatch {
        if self.faulted {
            return DecodedBatch {
                events: Vec::new(),
                fault: Some(DecodeFault::Faulted),
            };
        }

        self.buffer.extend_from_slice(bytes);

        if self.format == WireFormat::Auto {
            match self.buffer.first() {
                None => return DecodedBatch::default(),
                Some(&first) => match detect_format(first) {
                    Ok(format) => {
                        trace!("wire format detected: {format}");
                        self.format = format;
                    }
                    Err(fault) => return self.fail(Vec::new(), fault),
                },
            }
        }

        let (events, consumed, fault) = decode_buffer(self.format, &self.buffer);
        if let Some(fault) = fault {
            return self.fail(events, fault);
        }
        self.buffer.drain(..consumed);
        DecodedBatch {
            events,
            fault: None,
        }
    }

    fn fail(&mut self, events: Vec<PointerEvent>, fault: DecodeFault) -> DecodedBatch {
        self.faulted = true;
        self.buffer.clear();
        DecodedBatch {
            events,
            fault: Some(fault),
        }
    }
}

/// Chooses a framing from the first byte of a connection.
fn detect_format(first: u8) -> Result<WireFormat, DecodeFault> {
    match first {
        PROTOCOL_VERSION => Ok(WireFormat::Binary),
        b'{' => Ok(WireFormat::JsonLines),
        b if b.is_ascii_whitespace() => Ok(WireFormat::JsonLines),
        other => Err(DecodeFault::UnrecognizedPreamble(other)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
