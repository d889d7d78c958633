//! Gesture interpretation.
//!
//! Turns raw pointer events into pan and pinch-rotate deltas:
//!
//! ```text
//!   pointers   phase      output per move
//!   ────────   ────────   ─────────────────────────────────────────────
//!      0       Idle       -
//!      1       Panning    Pan { dx, dy } since the previous move
//!      2       Pinching   PinchRotate { scale, rotation } since the pinch began
//! ```
//!
//! Pinch values are measured against the reference captured when the second
//! pointer landed, never accumulated move by move. Every pointer-count change
//! rebases: the remaining pointer's current position becomes the new origin.
//! All numeric hazards (non-finite input, coincident pointers) are absorbed
//! here so downstream code only ever sees finite deltas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::{PointerEvent, PointerPhase};
use crate::spatial::EPSILON;

/// Which interaction the pointers currently form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GesturePhase {
    /// No pointer down.
    #[default]
    Idle,
    /// One pointer down.
    Panning,
    /// Two pointers down.
    Pinching,
}

/// Kind of a gesture delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GestureKind {
    /// One-finger drag.
    Pan,
    /// Two-finger pinch and twist.
    PinchRotate,
}

/// A normalized interpretation of pointer motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureDelta {
    /// Kind of gesture.
    pub kind: GestureKind,
    /// Horizontal displacement in world units (screen-right positive).
    pub dx: f32,
    /// Vertical displacement in world units (screen-down positive).
    pub dy: f32,
    /// Distance ratio against the pinch reference (1.0 = unchanged).
    pub scale_factor: f32,
    /// Angle change against the pinch reference, in radians.
    pub rotation_delta: f32,
}

impl GestureDelta {
    /// A pan delta.
    #[must_use]
    pub const fn pan(dx: f32, dy: f32) -> Self {
        Self {
            kind: GestureKind::Pan,
            dx,
            dy,
            scale_factor: 1.0,
            rotation_delta: 0.0,
        }
    }

    /// A pinch-rotate delta.
    #[must_use]
    pub const fn pinch_rotate(scale_factor: f32, rotation_delta: f32) -> Self {
        Self {
            kind: GestureKind::PinchRotate,
            dx: 0.0,
            dy: 0.0,
            scale_factor,
            rotation_delta,
        }
    }
}

/// What a pointer event meant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum GestureSignal {
    /// The first pointer went down.
    Began {
        /// Pointer identifier.
        pointer_id: u32,
        /// X position in pixels.
        x: f32,
        /// Y position in pixels.
        y: f32,
    },
    /// Motion to apply.
    Delta(GestureDelta),
    /// Pointer count changed while still touching, or a degenerate pinch
    /// reference was replaced; references were reset.
    Rebased,
    /// The last pointer lifted.
    Ended,
}

/// Live state of one continuous touch interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureState {
    /// Current phase.
    pub phase: GesturePhase,
    /// Last known position per tracked pointer.
    pub pointers: BTreeMap<u32, (f32, f32)>,
    /// Pointer distance when the pinch began.
    pub reference_distance: f32,
    /// Pointer-pair angle when the pinch began.
    pub reference_angle: f32,
    /// Object scale when the current reference was taken.
    pub reference_scale: f32,
    /// Object rotation when the current reference was taken.
    pub reference_rotation: f32,
}

/// Converts pointer events into [`GestureSignal`]s.
#[derive(Debug, Clone)]
pub struct GestureInterpreter {
    state: GestureState,
    pan_sensitivity: f32,
}

impl GestureInterpreter {
    /// Create an interpreter converting pixels to world units at
    /// `pan_sensitivity` units per pixel.
    #[must_use]
    pub fn new(pan_sensitivity: f32) -> Self {
        Self {
            state: GestureState::default(),
            pan_sensitivity,
        }
    }

    /// Process one pointer event.
    pub fn handle(&mut self, event: &PointerEvent) -> Option<GestureSignal> {
        match event.phase {
            PointerPhase::Down => self.pointer_down(event),
            PointerPhase::Move => self.pointer_move(event),
            PointerPhase::Up | PointerPhase::Cancel => self.pointer_up(event.id),
        }
    }

    fn pointer_down(&mut self, event: &PointerEvent) -> Option<GestureSignal> {
        if !event.has_finite_position() {
            tracing::debug!("Dropping pointer {} down with non-finite position", event.id);
            return None;
        }
        if let Some(position) = self.state.pointers.get_mut(&event.id) {
            // Repeated down for a tracked pointer: treat as a position update.
            *position = (event.x, event.y);
            return None;
        }
        if self.state.pointers.len() >= 2 {
            tracing::debug!("Ignoring extra pointer {}", event.id);
            return None;
        }

        self.state.pointers.insert(event.id, (event.x, event.y));
        match self.state.pointers.len() {
            1 => {
                self.state.phase = GesturePhase::Panning;
                self.clear_references();
                Some(GestureSignal::Began {
                    pointer_id: event.id,
                    x: event.x,
                    y: event.y,
                })
            }
            _ => {
                self.start_pinch();
                Some(GestureSignal::Rebased)
            }
        }
    }

    fn pointer_move(&mut self, event: &PointerEvent) -> Option<GestureSignal> {
        if !event.has_finite_position() {
            return None;
        }
        let position = self.state.pointers.get_mut(&event.id)?;
        let previous = std::mem::replace(position, (event.x, event.y));

        match self.state.phase {
            GesturePhase::Panning => {
                let dx = (event.x - previous.0) * self.pan_sensitivity;
                let dy = (event.y - previous.1) * self.pan_sensitivity;
                Some(GestureSignal::Delta(GestureDelta::pan(dx, dy)))
            }
            GesturePhase::Pinching => {
                let (distance, angle) = self.pair_geometry()?;
                if self.state.reference_distance < EPSILON {
                    if distance < EPSILON {
                        return Some(GestureSignal::Delta(GestureDelta::pinch_rotate(1.0, 0.0)));
                    }
                    // The pair landed on one spot; measure from the first real spread.
                    self.state.reference_distance = distance;
                    self.state.reference_angle = angle;
                    tracing::debug!(
                        "Pinch reference reseeded: distance {distance:.2}px, angle {angle:.3}rad"
                    );
                    return Some(GestureSignal::Rebased);
                }
                if distance < EPSILON {
                    // Pointers met: no usable ratio or angle this move.
                    return Some(GestureSignal::Delta(GestureDelta::pinch_rotate(1.0, 0.0)));
                }
                let scale_factor = distance / self.state.reference_distance;
                let scale_factor = if scale_factor.is_finite() {
                    scale_factor
                } else {
                    1.0
                };
                let rotation_delta = angle - self.state.reference_angle;
                let rotation_delta = if rotation_delta.is_finite() {
                    rotation_delta
                } else {
                    0.0
                };
                Some(GestureSignal::Delta(GestureDelta::pinch_rotate(
                    scale_factor,
                    rotation_delta,
                )))
            }
            GesturePhase::Idle => None,
        }
    }

    fn pointer_up(&mut self, id: u32) -> Option<GestureSignal> {
        self.state.pointers.remove(&id)?;

        if self.state.pointers.is_empty() {
            self.reset();
            Some(GestureSignal::Ended)
        } else {
            // The survivor's stored position is where it is now, so the next
            // pan is measured from there.
            self.state.phase = GesturePhase::Panning;
            self.clear_references();
            Some(GestureSignal::Rebased)
        }
    }

    fn start_pinch(&mut self) {
        self.state.phase = GesturePhase::Pinching;
        let (distance, angle) = self.pair_geometry().unwrap_or((0.0, 0.0));
        self.state.reference_distance = distance;
        self.state.reference_angle = angle;
        tracing::debug!("Pinch started: distance {distance:.2}px, angle {angle:.3}rad");
    }

    /// Distance and angle between the two tracked pointers, ordered by id.
    fn pair_geometry(&self) -> Option<(f32, f32)> {
        let mut positions = self.state.pointers.values();
        let (ax, ay) = *positions.next()?;
        let (bx, by) = *positions.next()?;
        let (dx, dy) = (bx - ax, by - ay);
        Some((dx.hypot(dy), dy.atan2(dx)))
    }

    fn clear_references(&mut self) {
        self.state.reference_distance = 0.0;
        self.state.reference_angle = 0.0;
    }

    /// Record the object transform the current reference applies to.
    pub fn capture_baseline(&mut self, scale: f32, rotation: f32) {
        self.state.reference_scale = scale;
        self.state.reference_rotation = rotation;
    }

    /// Object `(scale, rotation)` captured for the current reference.
    #[must_use]
    pub fn baseline(&self) -> (f32, f32) {
        (self.state.reference_scale, self.state.reference_rotation)
    }

    /// Drop every pointer and reference.
    pub fn reset(&mut self) {
        self.state = GestureState::default();
    }

    /// Current gesture state.
    #[must_use]
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> GesturePhase {
        self.state.phase
    }

    /// Number of tracked pointers.
    #[must_use]
    pub fn pointer_count(&self) -> usize {
        self.state.pointers.len()
    }

    /// Whether any pointer is down.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.state.pointers.is_empty()
    }
}

impl Default for GestureInterpreter {
    fn default() -> Self {
        Self::new(crate::EngineConfig::default().pan_sensitivity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-4;

    fn delta(signal: Option<GestureSignal>) -> GestureDelta {
        match signal {
            Some(GestureSignal::Delta(d)) => d,
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn test_single_pointer_pans_with_sensitivity() {
        let mut gestures = GestureInterpreter::new(0.01);
        let began = gestures.handle(&PointerEvent::down(1, 100.0, 100.0));
        assert!(matches!(began, Some(GestureSignal::Began { pointer_id: 1, .. })));
        assert_eq!(gestures.phase(), GesturePhase::Panning);

        let d = delta(gestures.handle(&PointerEvent::moved(1, 150.0, 80.0)));
        assert_eq!(d.kind, GestureKind::Pan);
        assert!((d.dx - 0.5).abs() < TOLERANCE);
        assert!((d.dy + 0.2).abs() < TOLERANCE);

        // Frame-to-frame: the next move is measured from (150, 80).
        let d = delta(gestures.handle(&PointerEvent::moved(1, 160.0, 80.0)));
        assert!((d.dx - 0.1).abs() < TOLERANCE);
    }

    #[test]
    fn test_pinch_measures_against_reference() {
        let mut gestures = GestureInterpreter::default();
        gestures.handle(&PointerEvent::down(1, 100.0, 100.0));
        let rebased = gestures.handle(&PointerEvent::down(2, 200.0, 100.0));
        assert_eq!(rebased, Some(GestureSignal::Rebased));
        assert_eq!(gestures.phase(), GesturePhase::Pinching);
        assert!((gestures.state().reference_distance - 100.0).abs() < TOLERANCE);

        gestures.handle(&PointerEvent::moved(1, 50.0, 100.0));
        let d = delta(gestures.handle(&PointerEvent::moved(2, 250.0, 100.0)));
        // 200 / 100, not (150/100) * (200/150) compounded.
        assert_eq!(d.kind, GestureKind::PinchRotate);
        assert!((d.scale_factor - 2.0).abs() < TOLERANCE);
        assert!(d.rotation_delta.abs() < TOLERANCE);
    }

    #[test]
    fn test_twist_reports_angle_change() {
        let mut gestures = GestureInterpreter::default();
        gestures.handle(&PointerEvent::down(1, 0.0, 0.0));
        gestures.handle(&PointerEvent::down(2, 100.0, 0.0));
        let d = delta(gestures.handle(&PointerEvent::moved(2, 0.0, 100.0)));
        assert!((d.rotation_delta - std::f32::consts::FRAC_PI_2).abs() < TOLERANCE);
        assert!((d.scale_factor - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_coincident_pointers_hold_scale() {
        let mut gestures = GestureInterpreter::default();
        gestures.handle(&PointerEvent::down(1, 100.0, 100.0));
        gestures.handle(&PointerEvent::down(2, 100.0, 100.0));
        let d = delta(gestures.handle(&PointerEvent::moved(1, 100.0, 100.0)));
        assert!((d.scale_factor - 1.0).abs() < f32::EPSILON);
        assert!(d.rotation_delta.abs() < f32::EPSILON);
    }

    #[test]
    fn test_pointers_meeting_mid_pinch_keep_scale() {
        let mut gestures = GestureInterpreter::default();
        gestures.handle(&PointerEvent::down(1, 100.0, 100.0));
        gestures.handle(&PointerEvent::down(2, 200.0, 100.0));

        let d = delta(gestures.handle(&PointerEvent::moved(2, 100.0, 100.0)));
        assert!((d.scale_factor - 1.0).abs() < f32::EPSILON);
        assert!(d.rotation_delta.abs() < f32::EPSILON);

        // Spreading again measures against the original reference.
        let d = delta(gestures.handle(&PointerEvent::moved(2, 250.0, 100.0)));
        assert!((d.scale_factor - 1.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_coincident_landing_reseeds_reference() {
        let mut gestures = GestureInterpreter::default();
        gestures.handle(&PointerEvent::down(1, 100.0, 100.0));
        gestures.handle(&PointerEvent::down(2, 100.0, 100.0));
        assert!(gestures.state().reference_distance.abs() < f32::EPSILON);

        let signal = gestures.handle(&PointerEvent::moved(2, 150.0, 100.0));
        assert_eq!(signal, Some(GestureSignal::Rebased));
        assert!((gestures.state().reference_distance - 50.0).abs() < TOLERANCE);
        assert_eq!(gestures.phase(), GesturePhase::Pinching);

        let d = delta(gestures.handle(&PointerEvent::moved(2, 300.0, 100.0)));
        assert!((d.scale_factor - 4.0).abs() < TOLERANCE);
        assert!(d.rotation_delta.abs() < TOLERANCE);

        let d = delta(gestures.handle(&PointerEvent::moved(2, 100.0, 150.0)));
        assert!((d.rotation_delta - std::f32::consts::FRAC_PI_2).abs() < TOLERANCE);
    }

    #[test]
    fn test_two_to_one_rebases_without_jump() {
        let mut gestures = GestureInterpreter::new(0.01);
        gestures.handle(&PointerEvent::down(1, 100.0, 100.0));
        gestures.handle(&PointerEvent::down(2, 200.0, 100.0));
        gestures.handle(&PointerEvent::moved(2, 300.0, 100.0));

        let signal = gestures.handle(&PointerEvent::up(1, 100.0, 100.0));
        assert_eq!(signal, Some(GestureSignal::Rebased));
        assert_eq!(gestures.phase(), GesturePhase::Panning);
        assert!(gestures.state().reference_distance.abs() < f32::EPSILON);

        let d = delta(gestures.handle(&PointerEvent::moved(2, 305.0, 100.0)));
        assert_eq!(d.kind, GestureKind::Pan);
        assert!((d.dx - 0.05).abs() < TOLERANCE);
        assert!(d.dy.abs() < TOLERANCE);
    }

    #[test]
    fn test_last_pointer_up_ends_gesture() {
        let mut gestures = GestureInterpreter::default();
        gestures.handle(&PointerEvent::down(7, 10.0, 10.0));
        assert_eq!(
            gestures.handle(&PointerEvent::up(7, 10.0, 10.0)),
            Some(GestureSignal::Ended)
        );
        assert!(!gestures.is_active());
        assert_eq!(gestures.state(), &GestureState::default());
    }

    #[test]
    fn test_cancel_behaves_like_up() {
        let mut gestures = GestureInterpreter::default();
        gestures.handle(&PointerEvent::down(1, 10.0, 10.0));
        gestures.handle(&PointerEvent::down(2, 20.0, 10.0));
        assert_eq!(
            gestures.handle(&PointerEvent::cancel(2)),
            Some(GestureSignal::Rebased)
        );
        assert_eq!(
            gestures.handle(&PointerEvent::cancel(1)),
            Some(GestureSignal::Ended)
        );
    }

    #[test]
    fn test_third_pointer_is_ignored() {
        let mut gestures = GestureInterpreter::default();
        gestures.handle(&PointerEvent::down(1, 0.0, 0.0));
        gestures.handle(&PointerEvent::down(2, 100.0, 0.0));
        assert_eq!(gestures.handle(&PointerEvent::down(3, 50.0, 50.0)), None);
        assert_eq!(gestures.pointer_count(), 2);
        assert_eq!(gestures.handle(&PointerEvent::moved(3, 60.0, 60.0)), None);
        assert_eq!(gestures.handle(&PointerEvent::up(3, 60.0, 60.0)), None);
    }

    #[test]
    fn test_non_finite_events_are_dropped() {
        let mut gestures = GestureInterpreter::default();
        assert_eq!(gestures.handle(&PointerEvent::down(1, f32::NAN, 0.0)), None);
        assert!(!gestures.is_active());

        gestures.handle(&PointerEvent::down(1, 0.0, 0.0));
        assert_eq!(
            gestures.handle(&PointerEvent::moved(1, f32::INFINITY, 0.0)),
            None
        );
        let d = delta(gestures.handle(&PointerEvent::moved(1, 10.0, 0.0)));
        assert!(d.dx.is_finite());
    }

    #[test]
    fn test_move_for_unknown_pointer_is_ignored() {
        let mut gestures = GestureInterpreter::default();
        assert_eq!(gestures.handle(&PointerEvent::moved(4, 1.0, 1.0)), None);
        assert_eq!(gestures.handle(&PointerEvent::up(4, 1.0, 1.0)), None);
    }

    #[test]
    fn test_baseline_is_kept_until_reset() {
        let mut gestures = GestureInterpreter::default();
        gestures.handle(&PointerEvent::down(1, 0.0, 0.0));
        gestures.capture_baseline(1.5, 0.25);
        assert_eq!(gestures.baseline(), (1.5, 0.25));
        gestures.reset();
        assert_eq!(gestures.baseline(), (0.0, 0.0));
    }
}
