//! The AR session context.
//!
//! One [`ArSession`] owns everything a placement session mutates: reticle,
//! placed objects, gesture state. The host drives it from its frame callback:
//!
//! ```text
//!  pointer callbacks ──► queue ─┐
//!                               ▼
//!  frame callback ──► advance_frame: hits ─► reticle ─► drain queue ─► gestures ─► machine
//!                                                                                   │
//!  renderer ◄── reticle_state / placed_objects / active_transform / drain_disposed ┘
//! ```
//!
//! Nothing here blocks and nothing is shared across threads.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::event::PointerEvent;
use crate::gesture::{GestureInterpreter, GestureState};
use crate::manipulation::{ActiveTransform, ManipulationMachine, ManipulationPhase, ScaleStep};
use crate::reticle::{ReticleState, ReticleTracker};
use crate::source::{NativeHit, PoseSourceAdapter};
use crate::spatial::{Pose, Viewer};
use crate::store::{AnchorId, AnchoredObject, CommitOutcome};
use crate::{EngineConfig, PlacementError, PlacementResult};

/// How placement poses are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackingMode {
    /// Real surface hit-testing.
    HitTest,
    /// Screen-space rays onto a fixed-distance plane.
    Fallback,
}

/// Lifecycle status of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Not started, or ended.
    Stopped,
    /// Tracking frames are being processed.
    Running,
    /// The collaborator could not start tracking.
    Failed,
}

/// Handle to the collaborator's hit-test subscription.
pub trait TrackingSubscription: std::fmt::Debug {
    /// Stop delivering hit-test results. Called exactly once, on session end.
    fn cancel(&mut self);
}

/// A subscription cancelled through a closure.
pub struct FnSubscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl FnSubscription {
    /// Wrap a cancel callback.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl std::fmt::Debug for FnSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSubscription")
            .field("cancelled", &self.cancel.is_none())
            .finish()
    }
}

impl TrackingSubscription for FnSubscription {
    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Everything the tracking collaborator delivers for one rendered frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    /// Camera for this frame.
    pub viewer: Viewer,
    /// Hit-test results, in tracker order.
    #[serde(default)]
    pub hits: Vec<NativeHit>,
    /// Reference space the hits are expressed in.
    #[serde(default)]
    pub reference: Pose,
}

impl FrameInput {
    /// A frame with no hit-test results.
    #[must_use]
    pub fn new(viewer: Viewer) -> Self {
        Self {
            viewer,
            hits: Vec::new(),
            reference: Pose::identity(),
        }
    }

    /// Attach hit-test results.
    #[must_use]
    pub fn with_hits(mut self, hits: Vec<NativeHit>) -> Self {
        self.hits = hits;
        self
    }
}

/// What one frame changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Reticle after the frame.
    pub reticle: ReticleState,
    /// Phase after the frame.
    pub phase: ManipulationPhase,
    /// Number of queued pointer events processed.
    pub pointer_events: usize,
}

/// Serializable view of the whole session for hosts and tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Tracking mode, while running.
    pub mode: Option<TrackingMode>,
    /// Manipulation phase.
    pub phase: ManipulationPhase,
    /// Reticle for the renderer.
    pub reticle: ReticleState,
    /// Placed objects, oldest first.
    pub objects: Vec<AnchoredObject>,
    /// Active object transform.
    pub active: Option<ActiveTransform>,
}

/// A single placement session.
#[derive(Debug)]
pub struct ArSession {
    config: EngineConfig,
    adapter: PoseSourceAdapter,
    reticle: ReticleTracker,
    gestures: GestureInterpreter,
    machine: ManipulationMachine,
    pending: VecDeque<PointerEvent>,
    viewer: Viewer,
    status: SessionStatus,
    mode: Option<TrackingMode>,
    subscription: Option<Box<dyn TrackingSubscription>>,
    last_failure: Option<String>,
}

impl ArSession {
    /// Create a stopped session.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::InvalidConfig`] if the configuration is out of range.
    pub fn new(config: EngineConfig) -> PlacementResult<Self> {
        config.validate()?;
        Ok(Self {
            adapter: PoseSourceAdapter::new(config.fallback_distance),
            reticle: ReticleTracker::new(config.vertical_normal_threshold),
            gestures: GestureInterpreter::new(config.pan_sensitivity),
            machine: ManipulationMachine::new(config.clone()),
            config,
            pending: VecDeque::new(),
            viewer: Viewer::default(),
            status: SessionStatus::Stopped,
            mode: None,
            subscription: None,
            last_failure: None,
        })
    }

    /// The collaborator started tracking in `mode`.
    ///
    /// A running session is ended first.
    pub fn start(&mut self, mode: TrackingMode, subscription: Option<Box<dyn TrackingSubscription>>) {
        if self.status == SessionStatus::Running {
            self.end();
        }
        tracing::info!("Placement session started in {mode:?} mode");
        self.status = SessionStatus::Running;
        self.mode = Some(mode);
        self.subscription = subscription;
        self.last_failure = None;
    }

    /// The collaborator could not start tracking (camera denied, XR session
    /// refused, timeout).
    pub fn report_start_failure(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Placement session failed to start: {reason}");
        if self.status == SessionStatus::Running {
            self.end();
        }
        self.status = SessionStatus::Failed;
        self.last_failure = Some(reason);
    }

    /// The start failure as an error, if the last start failed.
    #[must_use]
    pub fn start_error(&self) -> Option<PlacementError> {
        self.last_failure
            .as_ref()
            .map(|reason| PlacementError::SessionStart(reason.clone()))
    }

    /// Whether frames are being processed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Queue a pointer event for the next frame.
    pub fn on_pointer_event(&mut self, event: PointerEvent) {
        if self.is_running() {
            self.pending.push_back(event);
        } else {
            tracing::debug!("Dropping pointer event while session is not running");
        }
    }

    /// Process one frame: update the reticle, then apply queued input.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::SessionNotRunning`] if the session has not
    /// started or has ended; late frames can be ignored by the caller.
    pub fn advance_frame(&mut self, frame: &FrameInput) -> PlacementResult<FrameSummary> {
        if !self.is_running() {
            return Err(PlacementError::SessionNotRunning);
        }
        self.viewer = frame.viewer;
        // Rotation math assumes a unit quaternion.
        self.viewer.pose.orientation = self.viewer.pose.orientation.normalize();

        match self.mode {
            Some(TrackingMode::HitTest) => {
                let hits = self.adapter.normalize_all(&frame.hits, &frame.reference);
                self.reticle.update_from_candidates(&hits);
            }
            Some(TrackingMode::Fallback) => {
                let hit = self.adapter.fallback_center(&self.viewer);
                self.reticle.update(hit.as_ref());
            }
            None => {
                self.reticle.update(None);
            }
        }
        self.machine.on_reticle(&self.reticle.state());

        let pointer_events = self.pending.len();
        while let Some(event) = self.pending.pop_front() {
            if let Some(signal) = self.gestures.handle(&event) {
                self.machine
                    .handle_signal(&signal, &self.viewer, &mut self.gestures);
            }
        }

        Ok(FrameSummary {
            reticle: self.reticle.state(),
            phase: self.machine.phase(),
            pointer_events,
        })
    }

    /// Anchor a new object at the reticle.
    pub fn commit(&mut self) -> CommitOutcome {
        if !self.is_running() {
            return CommitOutcome::SessionInactive;
        }
        self.machine.commit(&self.reticle.state())
    }

    /// Anchor a new object where a fallback ray through `(x, y)` lands.
    pub fn place_at_pointer(&mut self, x: f32, y: f32) -> CommitOutcome {
        if !self.is_running() {
            return CommitOutcome::SessionInactive;
        }
        let hit = self.adapter.fallback_ray(&self.viewer, x, y);
        self.reticle.update(hit.as_ref());
        self.machine.commit(&self.reticle.state())
    }

    /// Step the active object's scale up or down.
    pub fn step_scale(&mut self, step: ScaleStep) -> Option<ActiveTransform> {
        self.machine.step_scale(step)
    }

    /// Rotate the active object by the configured step.
    pub fn rotate_step(&mut self) -> Option<ActiveTransform> {
        self.machine.rotate_step()
    }

    /// Restore the active object to its commit-time transform.
    pub fn reset_active(&mut self) -> Option<ActiveTransform> {
        self.machine.reset_active()
    }

    /// Hold or release reticle-follow repositioning.
    pub fn set_repositioning(&mut self, hold: bool) {
        self.machine.set_repositioning(hold);
    }

    /// Remove a placed object.
    pub fn evict(&mut self, id: AnchorId) -> bool {
        self.machine.evict(id)
    }

    /// End the session.
    ///
    /// Cancels the hit-test subscription, clears gesture state, queues every
    /// object for disposal and returns to `Idle`, in that order.
    pub fn end(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.gestures.reset();
        self.pending.clear();
        self.machine.end_session();
        self.reticle.reset();
        self.status = SessionStatus::Stopped;
        self.mode = None;
        tracing::info!("Placement session ended");
    }

    /// Current reticle.
    #[must_use]
    pub fn reticle_state(&self) -> ReticleState {
        self.reticle.state()
    }

    /// Placed objects, oldest first.
    pub fn placed_objects(&self) -> impl Iterator<Item = &AnchoredObject> {
        self.machine.store().iter()
    }

    /// Transform of the active object.
    #[must_use]
    pub fn active_transform(&self) -> Option<ActiveTransform> {
        self.machine.active_transform()
    }

    /// Current manipulation phase.
    #[must_use]
    pub fn phase(&self) -> ManipulationPhase {
        self.machine.phase()
    }

    /// Take objects whose renderer resources must be released.
    pub fn drain_disposed(&mut self) -> Vec<AnchoredObject> {
        self.machine.store_mut().drain_disposed()
    }

    /// Current gesture state.
    #[must_use]
    pub fn gesture_state(&self) -> &GestureState {
        self.gestures.state()
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Tracking mode while running.
    #[must_use]
    pub const fn mode(&self) -> Option<TrackingMode> {
        self.mode
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Camera of the latest frame.
    #[must_use]
    pub const fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Serializable snapshot of every output.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            mode: self.mode,
            phase: self.phase(),
            reticle: self.reticle_state(),
            objects: self.placed_objects().cloned().collect(),
            active: self.active_transform(),
        }
    }

    /// Snapshot serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn snapshot_json(&self) -> PlacementResult<String> {
        serde_json::to_string(&self.snapshot()).map_err(PlacementError::Serialization)
    }
}

impl Default for ArSession {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            adapter: PoseSourceAdapter::default(),
            reticle: ReticleTracker::default(),
            gestures: GestureInterpreter::default(),
            machine: ManipulationMachine::new(EngineConfig::default()),
            pending: VecDeque::new(),
            viewer: Viewer::default(),
            status: SessionStatus::Stopped,
            mode: None,
            subscription: None,
            last_failure: None,
        }
    }
}
