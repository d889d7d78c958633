//! Raw pointer input delivered by the host page.

use serde::{Deserialize, Serialize};

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Pointer went down (finger touched).
    Down,
    /// Pointer moved while down.
    Move,
    /// Pointer lifted.
    Up,
    /// Pointer cancelled by the platform (e.g., palm rejection).
    Cancel,
}

impl PointerPhase {
    /// Parse the phase names browsers and touch APIs commonly use.
    ///
    /// Returns `None` for unknown names.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "down" | "start" | "pointerdown" | "touchstart" => Some(Self::Down),
            "move" | "moved" | "pointermove" | "touchmove" => Some(Self::Move),
            "up" | "end" | "ended" | "pointerup" | "touchend" => Some(Self::Up),
            "cancel" | "cancelled" | "pointercancel" | "touchcancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// A single pointer event keyed by pointer id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Pointer identifier (stable for the lifetime of one touch).
    pub id: u32,
    /// Phase of this event.
    pub phase: PointerPhase,
    /// X position in screen pixels.
    pub x: f32,
    /// Y position in screen pixels.
    pub y: f32,
}

impl PointerEvent {
    /// Create a new pointer event.
    #[must_use]
    pub const fn new(id: u32, phase: PointerPhase, x: f32, y: f32) -> Self {
        Self { id, phase, x, y }
    }

    /// Pointer-down event.
    #[must_use]
    pub const fn down(id: u32, x: f32, y: f32) -> Self {
        Self::new(id, PointerPhase::Down, x, y)
    }

    /// Pointer-move event.
    #[must_use]
    pub const fn moved(id: u32, x: f32, y: f32) -> Self {
        Self::new(id, PointerPhase::Move, x, y)
    }

    /// Pointer-up event.
    #[must_use]
    pub const fn up(id: u32, x: f32, y: f32) -> Self {
        Self::new(id, PointerPhase::Up, x, y)
    }

    /// Pointer-cancel event.
    #[must_use]
    pub const fn cancel(id: u32) -> Self {
        Self::new(id, PointerPhase::Cancel, 0.0, 0.0)
    }

    /// Whether the coordinates can be used for geometry.
    #[must_use]
    pub fn has_finite_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}
