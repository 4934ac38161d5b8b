//! Input abstraction layer.
//!
//! Normalizes host pointer, wheel, and focus events into a single
//! `InputEvent` enum consumed by the interaction resolver. All positions
//! are screen coordinates relative to the canvas origin.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Which pointer button started a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// Map a DOM `MouseEvent.button` code. Back/forward buttons map to `None`.
    pub fn from_dom(button: i16) -> Option<Self> {
        match button {
            0 => Some(Self::Primary),
            1 => Some(Self::Middle),
            2 => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// A normalized input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { position: Point, button: PointerButton },
    PointerMove { position: Point },
    PointerUp { position: Point },
    /// Pointer left the canvas. Commits like a release.
    PointerLeave,
    ContextMenu { position: Point },
    DoubleClick { position: Point },
    /// Vertical wheel delta in pixels; positive scrolls down (zooms out).
    Wheel { position: Point, delta_y: f64 },
    /// The canvas lost focus. Commits like a release.
    Blur,
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64, button: PointerButton) -> Self {
        Self::PointerDown {
            position: Point::new(x, y),
            button,
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove {
            position: Point::new(x, y),
        }
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp {
            position: Point::new(x, y),
        }
    }

    pub fn context_menu(x: f64, y: f64) -> Self {
        Self::ContextMenu {
            position: Point::new(x, y),
        }
    }

    pub fn double_click(x: f64, y: f64) -> Self {
        Self::DoubleClick {
            position: Point::new(x, y),
        }
    }

    pub fn wheel(x: f64, y: f64, delta_y: f64) -> Self {
        Self::Wheel {
            position: Point::new(x, y),
            delta_y,
        }
    }

    /// Extract position if this event carries one.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { position, .. }
            | Self::PointerMove { position }
            | Self::PointerUp { position }
            | Self::ContextMenu { position }
            | Self::DoubleClick { position }
            | Self::Wheel { position, .. } => Some(*position),
            Self::PointerLeave | Self::Blur => None,
        }
    }
}
