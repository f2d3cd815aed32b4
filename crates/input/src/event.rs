use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Pointer buttons, in the order browsers and windowing layers number them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// Map a numeric button index (0 primary, 1 middle, 2 secondary).
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Primary),
            1 => Some(Self::Middle),
            2 => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// A raw input event in screen space.
///
/// Keys are identified by name (`"ArrowLeft"`, `"a"`, `"="`), the way the
/// windowing layer reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    PointerMove(Vec2),
    PointerDown { button: PointerButton, position: Vec2 },
    PointerUp { button: PointerButton, position: Vec2 },
}

impl InputEvent {
    /// Pointer position carried by the event, if any.
    pub fn position(&self) -> Option<Vec2> {
        match self {
            Self::PointerMove(p) | Self::PointerDown { position: p, .. } | Self::PointerUp { position: p, .. } => {
                Some(*p)
            }
            Self::KeyDown(_) | Self::KeyUp(_) => None,
        }
    }
}
