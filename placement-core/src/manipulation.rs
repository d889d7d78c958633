//! Manipulation state machine.
//!
//! ```text
//!                 reticle visible
//!        ┌──────┐ ─────────────► ┌───────────┐   commit   ┌────────┐
//!        │ Idle │                │ Searching │ ─────────► │ Placed │ ◄─┐
//!        └──────┘ ◄───────────── └───────────┘            └────────┘   │
//!           ▲      reticle lost                  down on object │      │ last
//!           │                                                   ▼      │ pointer
//!           │ session end (from any state)            ┌──────────────┐ │ up
//!           └──────────────────────────────────────── │ Manipulating │─┘
//!                                                      └──────────────┘
//! ```
//!
//! The machine owns the placement store and the identity of the active
//! object. Gesture deltas only reach it after the interpreter has made them
//! finite, so nothing here can fail on bad input.

use serde::{Deserialize, Serialize};

use crate::gesture::{GestureDelta, GestureInterpreter, GestureKind, GestureSignal};
use crate::reticle::ReticleState;
use crate::spatial::{Quat, Vec3, Viewer};
use crate::store::{AnchorId, AnchoredObject, CommitOutcome, PlacementStore};
use crate::{EngineConfig, PlacementError, PlacementResult};

/// Externally visible lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManipulationPhase {
    /// Nothing placed and no reticle.
    #[default]
    Idle,
    /// Nothing placed, reticle live.
    Searching,
    /// An object is anchored and not being touched.
    Placed,
    /// A gesture is being applied to the active object.
    Manipulating,
}

/// Direction of a discrete scale step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleStep {
    /// Grow by the configured step.
    Up,
    /// Shrink by the configured step.
    Down,
}

/// Transform of the active object for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveTransform {
    /// Which object this is.
    pub id: AnchorId,
    /// World position.
    pub position: Vec3,
    /// Anchor orientation (before the in-plane rotation).
    pub orientation: Quat,
    /// Uniform scale.
    pub scale: f32,
    /// In-plane rotation normalized into `[0, 2π)`.
    pub rotation_z: f32,
}

impl ActiveTransform {
    fn of(object: &AnchoredObject) -> Self {
        Self {
            id: object.id,
            position: object.pose.position,
            orientation: object.pose.orientation,
            scale: object.scale,
            rotation_z: object.display_rotation(),
        }
    }
}

/// Lifecycle of the placed objects and the one being manipulated.
#[derive(Debug, Clone)]
pub struct ManipulationMachine {
    config: EngineConfig,
    store: PlacementStore,
    phase: ManipulationPhase,
    active: Option<AnchorId>,
    repositioning: bool,
}

impl ManipulationMachine {
    /// Create a machine for an already validated configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: PlacementStore::new(config.max_objects),
            config,
            phase: ManipulationPhase::Idle,
            active: None,
            repositioning: false,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ManipulationPhase {
        self.phase
    }

    /// The placement store.
    #[must_use]
    pub const fn store(&self) -> &PlacementStore {
        &self.store
    }

    /// Mutable access to the placement store (disposal draining).
    pub fn store_mut(&mut self) -> &mut PlacementStore {
        &mut self.store
    }

    /// ID of the active object.
    #[must_use]
    pub const fn active_id(&self) -> Option<AnchorId> {
        self.active
    }

    /// Transform of the active object.
    #[must_use]
    pub fn active_transform(&self) -> Option<ActiveTransform> {
        self.active_object().map(ActiveTransform::of)
    }

    fn active_object(&self) -> Option<&AnchoredObject> {
        self.active.and_then(|id| self.store.get(id))
    }

    fn active_object_mut(&mut self) -> Option<&mut AnchoredObject> {
        let id = self.active?;
        self.store.get_mut(id)
    }

    fn set_phase(&mut self, phase: ManipulationPhase) {
        if self.phase != phase {
            tracing::debug!("Manipulation phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Follow this frame's reticle.
    ///
    /// Switches between `Idle` and `Searching` while nothing is placed, and
    /// drags the active object along while repositioning.
    pub fn on_reticle(&mut self, reticle: &ReticleState) {
        match self.phase {
            ManipulationPhase::Idle | ManipulationPhase::Searching => {
                self.set_phase(if reticle.visible {
                    ManipulationPhase::Searching
                } else {
                    ManipulationPhase::Idle
                });
            }
            ManipulationPhase::Placed | ManipulationPhase::Manipulating => {
                if self.repositioning && reticle.visible {
                    if let Some(object) = self.active_object_mut() {
                        object.pose = reticle.pose;
                    }
                }
            }
        }
    }

    /// Anchor a new object at the reticle and make it active.
    pub fn commit(&mut self, reticle: &ReticleState) -> CommitOutcome {
        if self.phase == ManipulationPhase::Manipulating {
            tracing::debug!("Commit ignored: gesture in progress");
            return CommitOutcome::GestureInProgress;
        }
        let outcome = self.store.commit(reticle);
        if let CommitOutcome::Placed(id) = outcome {
            self.active = Some(id);
            self.set_phase(ManipulationPhase::Placed);
        }
        outcome
    }

    /// Remove an object; if it was active, the newest remaining one takes over.
    pub fn evict(&mut self, id: AnchorId) -> bool {
        if self.phase == ManipulationPhase::Manipulating && self.active == Some(id) {
            tracing::debug!("Refusing to evict {id} while it is being manipulated");
            return false;
        }
        if !self.store.evict(id) {
            return false;
        }
        if self.active == Some(id) {
            self.active = self.store.newest().map(|o| o.id);
            if self.active.is_none() {
                self.set_phase(ManipulationPhase::Idle);
            }
        }
        true
    }

    /// Whether the pixel `(x, y)` lands on the active object's on-screen bounds.
    #[must_use]
    pub fn hits_active_object(&self, viewer: &Viewer, x: f32, y: f32) -> bool {
        let Some(object) = self.active_object() else {
            return false;
        };
        let Some((cx, cy, depth)) = viewer.project(object.pose.position) else {
            return false;
        };

        let px_per_unit = viewer.focal_length_px() / depth;
        let half_w = self.config.object_extent[0] * object.scale * 0.5 * px_per_unit;
        let half_h = self.config.object_extent[1] * object.scale * 0.5 * px_per_unit;

        // Work in a y-up frame so the object's rotation reads counter-clockwise.
        let (ox, oy) = (x - cx, cy - y);
        let (sin, cos) = object.rotation_z.sin_cos();
        let local_x = ox * cos + oy * sin;
        let local_y = -ox * sin + oy * cos;

        local_x.abs() <= half_w && local_y.abs() <= half_h
    }

    /// React to one interpreted gesture signal.
    pub fn handle_signal(
        &mut self,
        signal: &GestureSignal,
        viewer: &Viewer,
        gestures: &mut GestureInterpreter,
    ) {
        match *signal {
            GestureSignal::Began { x, y, .. } => {
                if self.phase == ManipulationPhase::Placed && self.hits_active_object(viewer, x, y)
                {
                    self.capture_baseline(gestures);
                    self.set_phase(ManipulationPhase::Manipulating);
                }
            }
            GestureSignal::Rebased => {
                if self.phase == ManipulationPhase::Manipulating {
                    self.capture_baseline(gestures);
                }
            }
            GestureSignal::Delta(delta) => {
                if self.phase == ManipulationPhase::Manipulating {
                    if let Err(e) = self.apply_delta(&delta, gestures.baseline(), viewer) {
                        tracing::warn!("Dropping gesture delta: {e}");
                    }
                }
            }
            GestureSignal::Ended => {
                if self.phase == ManipulationPhase::Manipulating {
                    self.set_phase(ManipulationPhase::Placed);
                }
            }
        }
    }

    fn capture_baseline(&self, gestures: &mut GestureInterpreter) {
        if let Some(object) = self.active_object() {
            gestures.capture_baseline(object.scale, object.rotation_z);
        }
    }

    /// Apply a gesture delta to the active object.
    ///
    /// Pans move the object in the plane facing the viewer. Pinch-rotate
    /// deltas are relative to `baseline` (`(scale, rotation)` when the
    /// current pinch began); the resulting scale is clamped.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::NoActiveObject`] when nothing is placed.
    pub fn apply_delta(
        &mut self,
        delta: &GestureDelta,
        baseline: (f32, f32),
        viewer: &Viewer,
    ) -> PlacementResult<ActiveTransform> {
        let clamped_scale = self.config.clamp_scale(baseline.0 * delta.scale_factor);
        let right = viewer.right();
        let up = viewer.up();

        let object = self
            .active_object_mut()
            .ok_or(PlacementError::NoActiveObject)?;

        match delta.kind {
            GestureKind::Pan => {
                // Screen y grows downwards.
                let offset = right.scale(delta.dx).sub(&up.scale(delta.dy));
                object.pose.position = object.pose.position.add(&offset);
            }
            GestureKind::PinchRotate => {
                object.scale = clamped_scale;
                object.rotation_z = baseline.1 + delta.rotation_delta;
            }
        }
        Ok(ActiveTransform::of(object))
    }

    /// Multiply the active object's scale by the configured step.
    pub fn step_scale(&mut self, step: ScaleStep) -> Option<ActiveTransform> {
        let factor = match step {
            ScaleStep::Up => self.config.scale_step_up,
            ScaleStep::Down => self.config.scale_step_down,
        };
        let object = self.store.get_mut(self.active?)?;
        object.scale = self.config.clamp_scale(object.scale * factor);
        Some(ActiveTransform::of(object))
    }

    /// Add the configured rotation step to the active object.
    pub fn rotate_step(&mut self) -> Option<ActiveTransform> {
        let step = self.config.rotation_step;
        let object = self.active_object_mut()?;
        object.rotation_z += step;
        Some(ActiveTransform::of(object))
    }

    /// Restore the active object's commit-time pose, unit scale and no rotation.
    pub fn reset_active(&mut self) -> Option<ActiveTransform> {
        let scale = self.config.clamp_scale(1.0);
        let object = self.active_object_mut()?;
        object.pose = object.placed_pose;
        object.scale = scale;
        object.rotation_z = 0.0;
        tracing::debug!("Reset object {}", object.id);
        Some(ActiveTransform::of(object))
    }

    /// Start or stop dragging the active object along with the reticle.
    pub fn set_repositioning(&mut self, hold: bool) {
        self.repositioning = hold;
    }

    /// Whether reticle-follow repositioning is held.
    #[must_use]
    pub const fn is_repositioning(&self) -> bool {
        self.repositioning
    }

    /// Tear down: every object goes to the disposal queue and the machine
    /// returns to `Idle`.
    pub fn end_session(&mut self) {
        self.repositioning = false;
        self.store.dispose_all();
        self.active = None;
        self.set_phase(ManipulationPhase::Idle);
    }
}
