//! Pointer event records and wire constants.
//!
//! Every frame on the wire decodes to exactly one [`PointerEvent`].  The
//! binary layout of each payload is documented on [`FrameKind`].

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Current protocol version byte.  Always the first byte of a binary frame.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Size of the binary frame header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Longest client name accepted in a `Hello` frame, in bytes.
pub const MAX_CLIENT_NAME_LEN: usize = 64;

// ── Frame kinds ───────────────────────────────────────────────────────────────

/// Kind byte of a binary frame.
///
/// | kind | payload                                  |
/// |------|------------------------------------------|
/// | Hello        | UTF-8 client name (0..=64 bytes) |
/// | Ping         | empty                            |
/// | Disconnect   | empty                            |
/// | Move         | dx f32, dy f32                   |
/// | MoveAbsolute | x i32, y i32                     |
/// | Button       | button u8, pressed u8            |
/// | Click        | button u8                        |
/// | DoubleClick  | button u8                        |
/// | Scroll       | axis u8, amount f32              |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FrameKind {
    // Session control (0x00–0x0F)
    Hello = 0x01,
    Ping = 0x02,
    Disconnect = 0x03,
    // Pointer input (0x10–0x1F)
    Move = 0x10,
    MoveAbsolute = 0x11,
    Button = 0x12,
    Click = 0x13,
    DoubleClick = 0x14,
    Scroll = 0x15,
}

impl TryFrom<u8> for FrameKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(FrameKind::Hello),
            0x02 => Ok(FrameKind::Ping),
            0x03 => Ok(FrameKind::Disconnect),
            0x10 => Ok(FrameKind::Move),
            0x11 => Ok(FrameKind::MoveAbsolute),
            0x12 => Ok(FrameKind::Button),
            0x13 => Ok(FrameKind::Click),
            0x14 => Ok(FrameKind::DoubleClick),
            0x15 => Ok(FrameKind::Scroll),
            _ => Err(()),
        }
    }
}

impl FrameKind {
    /// Returns the exact payload length for fixed-shape kinds, or `None` for
    /// kinds with a variable payload (only `Hello`).
    pub fn fixed_payload_len(self) -> Option<usize> {
        match self {
            FrameKind::Hello => None,
            FrameKind::Ping | FrameKind::Disconnect => Some(0),
            FrameKind::Move | FrameKind::MoveAbsolute => Some(8),
            FrameKind::Button => Some(2),
            FrameKind::Click | FrameKind::DoubleClick => Some(1),
            FrameKind::Scroll => Some(5),
        }
    }

    /// Largest payload this kind may declare.
    pub fn max_payload_len(self) -> usize {
        self.fixed_payload_len().unwrap_or(MAX_CLIENT_NAME_LEN)
    }
}

// ── Buttons and axes ──────────────────────────────────────────────────────────

/// Mouse button identifier.
///
/// Ordered so the down-button set releases buttons in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum MouseButton {
    Left = 0x01,
    Right = 0x02,
    Middle = 0x03,
}

impl TryFrom<u8> for MouseButton {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(MouseButton::Left),
            0x02 => Ok(MouseButton::Right),
            0x03 => Ok(MouseButton::Middle),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        };
        f.write_str(name)
    }
}

/// Scroll direction.  Positive amounts scroll up (vertical) or right
/// (horizontal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScrollAxis {
    Vertical = 0x00,
    Horizontal = 0x01,
}

impl TryFrom<u8> for ScrollAxis {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ScrollAxis::Vertical),
            0x01 => Ok(ScrollAxis::Horizontal),
            _ => Err(()),
        }
    }
}

// ── Event record ──────────────────────────────────────────────────────────────

/// One decoded unit from the wire.
///
/// Immutable once decoded and consumed exactly once by the input translator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    /// Optional greeting carrying a display name for logs.
    Hello { client_name: String },
    /// Relative pointer displacement in device units (pre-sensitivity).
    Move { dx: f32, dy: f32 },
    /// Absolute pointer position in screen pixels.
    MoveAbsolute { x: i32, y: i32 },
    /// Explicit button state change; used for drags.
    Button { button: MouseButton, pressed: bool },
    /// Press followed by release.
    Click { button: MouseButton },
    /// Two clicks in a row.
    DoubleClick { button: MouseButton },
    /// Wheel movement in notches (pre-sensitivity).
    Scroll { axis: ScrollAxis, amount: f32 },
    /// Keep-alive; resets the idle timeout and nothing else.
    Ping,
    /// Client is closing the session deliberately.
    Disconnect,
}

impl PointerEvent {
    /// Returns the frame kind this event is encoded as.
    pub fn kind(&self) -> FrameKind {
        match self {
            PointerEvent::Hello { .. } => FrameKind::Hello,
            PointerEvent::Move { .. } => FrameKind::Move,
            PointerEvent::MoveAbsolute { .. } => FrameKind::MoveAbsolute,
            PointerEvent::Button { .. } => FrameKind::Button,
            PointerEvent::Click { .. } => FrameKind::Click,
            PointerEvent::DoubleClick { .. } => FrameKind::DoubleClick,
            PointerEvent::Scroll { .. } => FrameKind::Scroll,
            PointerEvent::Ping => FrameKind::Ping,
            PointerEvent::Disconnect => FrameKind::Disconnect,
        }
    }

    /// Short variant name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            PointerEvent::Hello { .. } => "Hello",
            PointerEvent::Move { .. } => "Move",
            PointerEvent::MoveAbsolute { .. } => "MoveAbsolute",
            PointerEvent::Button { .. } => "Button",
            PointerEvent::Click { .. } => "Click",
            PointerEvent::DoubleClick { .. } => "DoubleClick",
            PointerEvent::Scroll { .. } => "Scroll",
            PointerEvent::Ping => "Ping",
            PointerEvent::Disconnect => "Disconnect",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
