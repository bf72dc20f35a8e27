//! Binary codec for pointer frames.
//!
//! Wire format:
//! ```text
//! [version:1][kind:1][payload_len:2][payload:N]
//! ```
//! Total header size: 4 bytes. All multi-byte integers and floats are
//! big-endian.
//!
//! Decoding validates each header field as soon as its byte is available, so a
//! corrupt leading byte is reported immediately instead of after waiting for a
//! header that will never make sense.

use crate::protocol::messages::{
    FrameKind, MouseButton, PointerEvent, ScrollAxis, HEADER_SIZE, MAX_CLIENT_NAME_LEN,
    PROTOCOL_VERSION,
};
use thiserror::Error;

/// A malformed or unrecognised frame.
///
/// Every variant is fatal for the session that produced it: the decoder never
/// tries to guess where the next frame starts.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeFault {
    /// The version byte at the start of a frame is not [`PROTOCOL_VERSION`].
    #[error("unsupported protocol version byte: 0x{0:02X}")]
    UnsupportedVersion(u8),

    /// The kind byte is not a recognised [`FrameKind`].
    #[error("unknown frame kind: 0x{0:02X}")]
    UnknownKind(u8),

    /// A fixed-shape frame declared the wrong payload length.
    #[error("payload length mismatch for {kind:?}: declared {declared}, expected {expected}")]
    PayloadLengthMismatch {
        kind: FrameKind,
        declared: usize,
        expected: usize,
    },

    /// A variable-length frame declared a payload above its limit.
    #[error("payload too large for {kind:?}: declared {declared}, limit {limit}")]
    PayloadTooLarge {
        kind: FrameKind,
        declared: usize,
        limit: usize,
    },

    /// The payload could not be parsed (field value out of range, UTF-8 error, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The first byte of the connection matches no supported wire format.
    #[error("unrecognised stream preamble byte: 0x{0:02X}")]
    UnrecognizedPreamble(u8),

    /// A JSON command line could not be parsed.
    #[error("invalid JSON command: {0}")]
    InvalidJson(String),

    /// A JSON command line exceeded the length limit without a newline.
    #[error("command line longer than {limit} bytes")]
    LineTooLong { limit: usize },

    /// The decoder already reported a fault and refuses further input.
    #[error("decoder already faulted")]
    Faulted,
}

/// Errors from [`encode_frame`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EncodeError {
    #[error("client name is {len} bytes, limit is {}", MAX_CLIENT_NAME_LEN)]
    ClientNameTooLong { len: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`PointerEvent`] as one binary frame including the 4-byte header.
///
/// # Errors
///
/// Returns [`EncodeError::ClientNameTooLong`] if a `Hello` name exceeds
/// [`MAX_CLIENT_NAME_LEN`].
///
/// # Examples
///
/// ```rust
/// use padmouse_core::protocol::{decode_frame, encode_frame, PointerEvent};
///
/// let bytes = encode_frame(&PointerEvent::Ping).unwrap();
/// let (decoded, consumed) = decode_frame(&bytes).unwrap().unwrap();
/// assert_eq!(decoded, PointerEvent::Ping);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_frame(event: &PointerEvent) -> Result<Vec<u8>, EncodeError> {
    let mut payload = Vec::with_capacity(8);
    match event {
        PointerEvent::Hello { client_name } => {
            if client_name.len() > MAX_CLIENT_NAME_LEN {
                return Err(EncodeError::ClientNameTooLong {
                    len: client_name.len(),
                });
            }
            payload.extend_from_slice(client_name.as_bytes());
        }
        PointerEvent::Ping | PointerEvent::Disconnect => {}
        PointerEvent::Move { dx, dy } => {
            payload.extend_from_slice(&dx.to_be_bytes());
            payload.extend_from_slice(&dy.to_be_bytes());
        }
        PointerEvent::MoveAbsolute { x, y } => {
            payload.extend_from_slice(&x.to_be_bytes());
            payload.extend_from_slice(&y.to_be_bytes());
        }
        PointerEvent::Button { button, pressed } => {
            payload.push(*button as u8);
            payload.push(u8::from(*pressed));
        }
        PointerEvent::Click { button } | PointerEvent::DoubleClick { button } => {
            payload.push(*button as u8);
        }
        PointerEvent::Scroll { axis, amount } => {
            payload.push(*axis as u8);
            payload.extend_from_slice(&amount.to_be_bytes());
        }
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.push(PROTOCOL_VERSION);
    buf.push(event.kind() as u8);
    buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decodes one frame from the beginning of `bytes`.
///
/// Returns `Ok(None)` when `bytes` holds only a prefix of a valid frame (more
/// input is needed), or the decoded event and the number of bytes it occupied.
///
/// # Errors
///
/// Returns [`DecodeFault`] as soon as the buffered prefix can no longer be the
/// start of a valid frame.
pub fn decode_frame(bytes: &[u8]) -> Result<Option<(PointerEvent, usize)>, DecodeFault> {
    let Some(&version) = bytes.first() else {
        return Ok(None);
    };
    if version != PROTOCOL_VERSION {
        return Err(DecodeFault::UnsupportedVersion(version));
    }

    let Some(&kind_byte) = bytes.get(1) else {
        return Ok(None);
    };
    let kind = FrameKind::try_from(kind_byte).map_err(|_| DecodeFault::UnknownKind(kind_byte))?;

    if bytes.len() < HEADER_SIZE {
        return Ok(None);
    }
    let declared = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    check_declared_len(kind, declared)?;

    let total = HEADER_SIZE + declared;
    if bytes.len() < total {
        return Ok(None);
    }

    let event = decode_payload(kind, &bytes[HEADER_SIZE..total])?;
    Ok(Some((event, total)))
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn check_declared_len(kind: FrameKind, declared: usize) -> Result<(), DecodeFault> {
    match kind.fixed_payload_len() {
        Some(expected) if expected != declared => Err(DecodeFault::PayloadLengthMismatch {
            kind,
            declared,
            expected,
        }),
        None if declared > kind.max_payload_len() => Err(DecodeFault::PayloadTooLarge {
            kind,
            declared,
            limit: kind.max_payload_len(),
        }),
        _ => Ok(()),
    }
}

fn decode_payload(kind: FrameKind, p: &[u8]) -> Result<PointerEvent, DecodeFault> {
    match kind {
        FrameKind::Hello => {
            let client_name = std::str::from_utf8(p)
                .map_err(|e| DecodeFault::MalformedPayload(format!("client name: {e}")))?
                .to_string();
            Ok(PointerEvent::Hello { client_name })
        }
        FrameKind::Ping => Ok(PointerEvent::Ping),
        FrameKind::Disconnect => Ok(PointerEvent::Disconnect),
        FrameKind::Move => Ok(PointerEvent::Move {
            dx: read_finite_f32(p, 0, "Move.dx")?,
            dy: read_finite_f32(p, 4, "Move.dy")?,
        }),
        FrameKind::MoveAbsolute => Ok(PointerEvent::MoveAbsolute {
            x: read_i32(p, 0),
            y: read_i32(p, 4),
        }),
        FrameKind::Button => {
            let button = read_button(p[0])?;
            let pressed = match p[1] {
                0x00 => false,
                0x01 => true,
                other => {
                    return Err(DecodeFault::MalformedPayload(format!(
                        "button pressed flag must be 0 or 1, got {other}"
                    )))
                }
            };
            Ok(PointerEvent::Button { button, pressed })
        }
        FrameKind::Click => Ok(PointerEvent::Click {
            button: read_button(p[0])?,
        }),
        FrameKind::DoubleClick => Ok(PointerEvent::DoubleClick {
            button: read_button(p[0])?,
        }),
        FrameKind::Scroll => {
            let axis = ScrollAxis::try_from(p[0])
                .map_err(|_| DecodeFault::MalformedPayload(format!("unknown scroll axis: {}", p[0])))?;
            Ok(PointerEvent::Scroll {
                axis,
                amount: read_finite_f32(p, 1, "Scroll.amount")?,
            })
        }
    }
}

// ── Primitive readers ─────────────────────────────────────────────────────────
//
// Callers have already checked the payload length against the kind, so the
// fixed offsets below are always in bounds.

fn read_i32(p: &[u8], off: usize) -> i32 {
    i32::from_be_bytes([p[off], p[off + 1], p[off + 2], p[off + 3]])
}

fn read_finite_f32(p: &[u8], off: usize, field: &str) -> Result<f32, DecodeFault> {
    let value = f32::from_be_bytes([p[off], p[off + 1], p[off + 2], p[off + 3]]);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DecodeFault::MalformedPayload(format!("{field} is not finite")))
    }
}

fn read_button(byte: u8) -> Result<MouseButton, DecodeFault> {
    MouseButton::try_from(byte)
        .map_err(|_| DecodeFault::MalformedPayload(format!("unknown mouse button: {byte}")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![PROTOCOL_VERSION, kind];
        buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    // ── Header validation ─────────────────────────────────────────────────────

    #[test]
    fn test_decode_empty_input_needs_more_bytes() {
        assert_eq!(decode_frame(&[]), Ok(None));
    }

    #[test]
    fn test_decode_wrong_version_faults_on_first_byte() {
        // Only one byte buffered, and it is already wrong.
        assert_eq!(
            decode_frame(&[0x7B]),
            Err(DecodeFault::UnsupportedVersion(0x7B))
        );
    }

    #[test]
    fn test_decode_unknown_kind_faults_before_header_completes() {
        assert_eq!(
            decode_frame(&[PROTOCOL_VERSION, 0xEE]),
            Err(DecodeFault::UnknownKind(0xEE))
        );
    }

    #[test]
    fn test_decode_partial_header_needs_more_bytes() {
        assert_eq!(decode_frame(&[PROTOCOL_VERSION, 0x10, 0x00]), Ok(None));
    }

    #[test]
    fn test_decode_wrong_fixed_length_faults_without_waiting_for_payload() {
        // Move declares 200 bytes but must carry exactly 8.
        let header = [PROTOCOL_VERSION, FrameKind::Move as u8, 0x00, 200];
        assert_eq!(
            decode_frame(&header),
            Err(DecodeFault::PayloadLengthMismatch {
                kind: FrameKind::Move,
                declared: 200,
                expected: 8,
            })
        );
    }

    #[test]
    fn test_decode_oversized_hello_faults() {
        let header = [PROTOCOL_VERSION, FrameKind::Hello as u8, 0x01, 0x00];
        assert_eq!(
            decode_frame(&header),
            Err(DecodeFault::PayloadTooLarge {
                kind: FrameKind::Hello,
                declared: 256,
                limit: MAX_CLIENT_NAME_LEN,
            })
        );
    }

    #[test]
    fn test_decode_partial_payload_needs_more_bytes() {
        let bytes = frame(FrameKind::Move as u8, &[0u8; 8]);
        assert_eq!(decode_frame(&bytes[..7]), Ok(None));
    }

    // ── Payloads ──────────────────────────────────────────────────────────────

    #[test]
    fn test_decode_move_reads_big_endian_floats() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1.5f32.to_be_bytes());
        payload.extend_from_slice(&(-2.25f32).to_be_bytes());
        let bytes = frame(FrameKind::Move as u8, &payload);

        let (event, consumed) = decode_frame(&bytes).unwrap().unwrap();

        assert_eq!(event, PointerEvent::Move { dx: 1.5, dy: -2.25 });
        assert_eq!(consumed, 12);
    }

    #[test]
    fn test_decode_move_rejects_nan() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&f32::NAN.to_be_bytes());
        payload.extend_from_slice(&0f32.to_be_bytes());
        let bytes = frame(FrameKind::Move as u8, &payload);

        assert!(matches!(
            decode_frame(&bytes),
            Err(DecodeFault::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_button_press() {
        let bytes = frame(FrameKind::Button as u8, &[0x02, 0x01]);
        let (event, _) = decode_frame(&bytes).unwrap().unwrap();
        assert_eq!(
            event,
            PointerEvent::Button {
                button: MouseButton::Right,
                pressed: true
            }
        );
    }

    #[test]
    fn test_decode_button_rejects_invalid_pressed_flag() {
        let bytes = frame(FrameKind::Button as u8, &[0x01, 0x02]);
        assert!(matches!(
            decode_frame(&bytes),
            Err(DecodeFault::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_click_rejects_unknown_button() {
        let bytes = frame(FrameKind::Click as u8, &[0x09]);
        assert!(matches!(
            decode_frame(&bytes),
            Err(DecodeFault::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_scroll_rejects_unknown_axis() {
        let mut payload = vec![0x05];
        payload.extend_from_slice(&1f32.to_be_bytes());
        let bytes = frame(FrameKind::Scroll as u8, &payload);
        assert!(matches!(
            decode_frame(&bytes),
            Err(DecodeFault::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_hello_rejects_invalid_utf8() {
        let bytes = frame(FrameKind::Hello as u8, &[0xFF, 0xFE]);
        assert!(matches!(
            decode_frame(&bytes),
            Err(DecodeFault::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_only_consumes_first_frame() {
        let mut bytes = encode_frame(&PointerEvent::Ping).unwrap();
        bytes.extend(encode_frame(&PointerEvent::Disconnect).unwrap());

        let (event, consumed) = decode_frame(&bytes).unwrap().unwrap();

        assert_eq!(event, PointerEvent::Ping);
        assert_eq!(consumed, HEADER_SIZE);
    }

    // ── Encoding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_encode_scroll_layout() {
        let bytes = encode_frame(&PointerEvent::Scroll {
            axis: ScrollAxis::Horizontal,
            amount: 3.0,
        })
        .unwrap();

        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(bytes[1], FrameKind::Scroll as u8);
        assert_eq!(&bytes[2..4], &[0x00, 0x05]);
        assert_eq!(bytes[4], ScrollAxis::Horizontal as u8);
        assert_eq!(&bytes[5..9], &3.0f32.to_be_bytes());
    }

    #[test]
    fn test_encode_hello_rejects_long_name() {
        let name = "x".repeat(MAX_CLIENT_NAME_LEN + 1);
        assert_eq!(
            encode_frame(&PointerEvent::Hello { client_name: name }),
            Err(EncodeError::ClientNameTooLong {
                len: MAX_CLIENT_NAME_LEN + 1
            })
        );
    }

    #[test]
    fn test_encode_then_decode_every_kind() {
        let events = vec![
            PointerEvent::Hello {
                client_name: "Pixel 8".to_string(),
            },
            PointerEvent::Ping,
            PointerEvent::Disconnect,
            PointerEvent::Move { dx: 0.5, dy: -7.0 },
            PointerEvent::MoveAbsolute { x: 100, y: -3 },
            PointerEvent::Button {
                button: MouseButton::Left,
                pressed: false,
            },
            PointerEvent::Click {
                button: MouseButton::Middle,
            },
            PointerEvent::DoubleClick {
                button: MouseButton::Left,
            },
            PointerEvent::Scroll {
                axis: ScrollAxis::Vertical,
                amount: -1.5,
            },
        ];
        for event in events {
            let bytes = encode_frame(&event).unwrap();
            let (decoded, consumed) = decode_frame(&bytes).unwrap().unwrap();
            assert_eq!(decoded, event);
            assert_eq!(consumed, bytes.len());
        }
    }
}
