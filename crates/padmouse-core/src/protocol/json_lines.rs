//! Newline-delimited JSON command format.
//!
//! Older builds of the companion app send one JSON object per line:
//!
//! ```text
//! {"type":"move","deltaX":4.5,"deltaY":-1}\n
//! {"type":"click","button":"right"}\n
//! {"type":"scroll","deltaY":35}\n
//! ```
//!
//! Each line maps to zero or more [`PointerEvent`]s.  Scroll deltas use the
//! app's touch units: they are divided by [`LEGACY_SCROLL_DIVISOR`] and an
//! axis is only emitted when its raw delta exceeds [`LEGACY_SCROLL_THRESHOLD`].

use serde::Deserialize;

use crate::protocol::codec::DecodeFault;
use crate::protocol::messages::{MouseButton, PointerEvent, ScrollAxis};

/// Longest accepted line, excluding the terminating newline.
pub const MAX_LINE_LEN: usize = 1024;

/// Touch units per scroll notch.
pub const LEGACY_SCROLL_DIVISOR: f64 = 10.0;

/// Raw scroll deltas at or below this magnitude are ignored.
pub const LEGACY_SCROLL_THRESHOLD: f64 = 1.0;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Command {
    Move {
        #[serde(rename = "deltaX", default)]
        delta_x: f64,
        #[serde(rename = "deltaY", default)]
        delta_y: f64,
    },
    MoveTo {
        x: i32,
        y: i32,
    },
    Click {
        #[serde(default = "default_button")]
        button: MouseButton,
    },
    DoubleClick {
        #[serde(default = "default_button")]
        button: MouseButton,
    },
    Button {
        button: MouseButton,
        pressed: bool,
    },
    Scroll {
        #[serde(rename = "deltaX", default)]
        delta_x: f64,
        #[serde(rename = "deltaY", default)]
        delta_y: f64,
    },
    Ping,
    Hello {
        #[serde(default)]
        name: String,
    },
    Disconnect,
}

fn default_button() -> MouseButton {
    MouseButton::Left
}

/// Parses one line (without its `\n`) into event records.
///
/// Blank lines yield no events.  A trailing `\r` is tolerated.
///
/// # Errors
///
/// Returns [`DecodeFault::InvalidJson`] for unparsable JSON or an unknown
/// `type`, and [`DecodeFault::MalformedPayload`] for deltas that overflow `f32`.
pub fn decode_line(line: &[u8]) -> Result<Vec<PointerEvent>, DecodeFault> {
    let trimmed = trim_ascii_whitespace(line);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let command: Command =
        serde_json::from_slice(trimmed).map_err(|e| DecodeFault::InvalidJson(e.to_string()))?;

    let events = match command {
        Command::Move { delta_x, delta_y } => vec![PointerEvent::Move {
            dx: to_finite_f32(delta_x, "deltaX")?,
            dy: to_finite_f32(delta_y, "deltaY")?,
        }],
        Command::MoveTo { x, y } => vec![PointerEvent::MoveAbsolute { x, y }],
        Command::Click { button } => vec![PointerEvent::Click { button }],
        Command::DoubleClick { button } => vec![PointerEvent::DoubleClick { button }],
        Command::Button { button, pressed } => vec![PointerEvent::Button { button, pressed }],
        Command::Scroll { delta_x, delta_y } => {
            let mut events = Vec::with_capacity(2);
            for (axis, delta) in [
                (ScrollAxis::Vertical, delta_y),
                (ScrollAxis::Horizontal, delta_x),
            ] {
                if delta.abs() > LEGACY_SCROLL_THRESHOLD {
                    events.push(PointerEvent::Scroll {
                        axis,
                        amount: to_finite_f32(delta / LEGACY_SCROLL_DIVISOR, "scroll delta")?,
                    });
                }
            }
            events
        }
        Command::Ping => vec![PointerEvent::Ping],
        Command::Hello { name } => vec![PointerEvent::Hello { client_name: name }],
        Command::Disconnect => vec![PointerEvent::Disconnect],
    };
    Ok(events)
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn to_finite_f32(value: f64, field: &str) -> Result<f32, DecodeFault> {
    let narrowed = value as f32;
    if narrowed.is_finite() {
        Ok(narrowed)
    } else {
        Err(DecodeFault::MalformedPayload(format!("{field} out of range")))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_line_maps_camel_case_deltas() {
        let events = decode_line(br#"{"type":"move","deltaX":4.5,"deltaY":-1}"#).unwrap();
        assert_eq!(events, vec![PointerEvent::Move { dx: 4.5, dy: -1.0 }]);
    }

    #[test]
    fn test_move_line_missing_delta_defaults_to_zero() {
        let events = decode_line(br#"{"type":"move","deltaX":3}"#).unwrap();
        assert_eq!(events, vec![PointerEvent::Move { dx: 3.0, dy: 0.0 }]);
    }

    #[test]
    fn test_click_defaults_to_left_button() {
        let events = decode_line(br#"{"type":"click"}"#).unwrap();
        assert_eq!(
            events,
            vec![PointerEvent::Click {
                button: MouseButton::Left
            }]
        );
    }

    #[test]
    fn test_double_click_with_right_button() {
        let events = decode_line(br#"{"type":"double_click","button":"right"}"#).unwrap();
        assert_eq!(
            events,
            vec![PointerEvent::DoubleClick {
                button: MouseButton::Right
            }]
        );
    }

    #[test]
    fn test_button_line_carries_pressed_flag() {
        let events = decode_line(br#"{"type":"button","button":"middle","pressed":true}"#).unwrap();
        assert_eq!(
            events,
            vec![PointerEvent::Button {
                button: MouseButton::Middle,
                pressed: true
            }]
        );
    }

    #[test]
    fn test_scroll_divides_deltas_and_orders_vertical_first() {
        let events = decode_line(br#"{"type":"scroll","deltaX":-20,"deltaY":35}"#).unwrap();
        assert_eq!(
            events,
            vec![
                PointerEvent::Scroll {
                    axis: ScrollAxis::Vertical,
                    amount: 3.5
                },
                PointerEvent::Scroll {
                    axis: ScrollAxis::Horizontal,
                    amount: -2.0
                },
            ]
        );
    }

    #[test]
    fn test_scroll_below_threshold_is_ignored() {
        let events = decode_line(br#"{"type":"scroll","deltaX":0.5,"deltaY":1}"#).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_blank_and_crlf_lines() {
        assert!(decode_line(b"   ").unwrap().is_empty());
        assert_eq!(
            decode_line(b"{\"type\":\"ping\"}\r").unwrap(),
            vec![PointerEvent::Ping]
        );
    }

    #[test]
    fn test_hello_without_name() {
        assert_eq!(
            decode_line(br#"{"type":"hello"}"#).unwrap(),
            vec![PointerEvent::Hello {
                client_name: String::new()
            }]
        );
    }

    #[test]
    fn test_unknown_type_is_a_fault() {
        assert!(matches!(
            decode_line(br#"{"type":"teleport"}"#),
            Err(DecodeFault::InvalidJson(_))
        ));
    }

    #[test]
    fn test_garbage_is_a_fault() {
        assert!(matches!(
            decode_line(b"{not json"),
            Err(DecodeFault::InvalidJson(_))
        ));
    }

    #[test]
    fn test_delta_overflowing_f32_is_a_fault() {
        assert!(matches!(
            decode_line(br#"{"type":"move","deltaX":1e300}"#),
            Err(DecodeFault::MalformedPayload(_))
        ));
    }
}
