//! Recorded session traces and the replayer that drives them.
//!
//! A trace is a JSON document listing what a host page observed, in order:
//!
//! ```json
//! { "steps": [
//!     { "type": "start", "mode": "hit-test" },
//!     { "type": "frame", "hits": [ { "matrix": [ ... ] } ] },
//!     { "type": "commit" },
//!     { "type": "pointer", "id": 1, "phase": "down", "x": 400, "y": 300 },
//!     { "type": "end" }
//! ] }
//! ```
//!
//! Pointer steps only queue input; like a live session, they take effect on
//! the next `frame` step.

use std::path::Path;
use std::time::Duration;

use placement_core::{
    ActiveTransform, AnchorId, ArSession, CommitOutcome, EngineConfig, FnSubscription,
    FrameInput, FrameSummary, NativeHit, PointerEvent, Pose, ScaleStep, SessionSnapshot,
    TrackingMode, TrackingSubscription, Viewer,
};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;

use crate::{ReplayError, ReplayResult};

/// One recorded host action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceStep {
    /// Tracking started.
    Start {
        /// How poses are obtained.
        mode: TrackingMode,
    },
    /// Tracking could not be started.
    StartFailed {
        /// Why.
        reason: String,
    },
    /// A rendered frame.
    Frame {
        /// Camera for the frame.
        #[serde(default)]
        viewer: Viewer,
        /// Hit-test results.
        #[serde(default)]
        hits: Vec<NativeHit>,
        /// Reference space of the hits.
        #[serde(default)]
        reference: Pose,
    },
    /// A pointer event.
    Pointer(PointerEvent),
    /// The "place" button.
    Commit,
    /// A tap-to-place at a screen position.
    PlaceAt {
        /// X in pixels.
        x: f32,
        /// Y in pixels.
        y: f32,
    },
    /// A scale button.
    ScaleStep {
        /// Grow or shrink.
        direction: ScaleStep,
    },
    /// The rotate button.
    RotateStep,
    /// The reset button.
    Reset,
    /// Controller select held or released.
    Reposition {
        /// Whether the object follows the reticle.
        hold: bool,
    },
    /// The session was closed.
    End,
}

impl TraceStep {
    /// Short name used in reports and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::StartFailed { .. } => "start_failed",
            Self::Frame { .. } => "frame",
            Self::Pointer(_) => "pointer",
            Self::Commit => "commit",
            Self::PlaceAt { .. } => "place_at",
            Self::ScaleStep { .. } => "scale_step",
            Self::RotateStep => "rotate_step",
            Self::Reset => "reset",
            Self::Reposition { .. } => "reposition",
            Self::End => "end",
        }
    }

    /// Whether the step stands for a rendered frame.
    #[must_use]
    pub const fn is_frame(&self) -> bool {
        matches!(self, Self::Frame { .. })
    }
}

/// A recorded session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Steps in recording order.
    pub steps: Vec<TraceStep>,
}

impl Trace {
    /// Parse a trace from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Trace`] for malformed JSON or unknown step types.
    pub fn from_json(text: &str) -> ReplayResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a trace file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> ReplayResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Number of frame steps.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_frame()).count()
    }
}

/// What a single step produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step was accepted with nothing to report.
    Applied,
    /// A frame was processed.
    Frame(FrameSummary),
    /// A placement was attempted.
    Commit(CommitOutcome),
    /// A discrete transform action ran (`None` when nothing is placed).
    Transform(Option<ActiveTransform>),
    /// The engine refused the step.
    Rejected(String),
}

/// Engine outputs after one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Index of the step in the trace.
    pub index: usize,
    /// Step name.
    pub step: String,
    /// Direct result of the step.
    pub outcome: StepOutcome,
    /// Objects whose renderer resources were released by this step.
    pub disposed: Vec<AnchorId>,
    /// Session state after the step.
    pub snapshot: SessionSnapshot,
}

/// Drives an [`ArSession`] from trace steps.
#[derive(Debug)]
pub struct Replayer {
    session: ArSession,
    applied: usize,
}

impl Replayer {
    /// Create a replayer with a stopped session.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: EngineConfig) -> ReplayResult<Self> {
        Ok(Self {
            session: ArSession::new(config)?,
            applied: 0,
        })
    }

    /// The session being driven.
    #[must_use]
    pub const fn session(&self) -> &ArSession {
        &self.session
    }

    /// Apply one step and report the resulting engine outputs.
    pub fn apply(&mut self, step: &TraceStep) -> StepReport {
        let index = self.applied;
        self.applied += 1;
        tracing::debug!("Step {index}: {}", step.name());

        let outcome = match step {
            TraceStep::Start { mode } => {
                let subscription: Box<dyn TrackingSubscription> =
                    Box::new(FnSubscription::new(|| {
                        tracing::info!("Hit-test subscription cancelled");
                    }));
                self.session.start(*mode, Some(subscription));
                StepOutcome::Applied
            }
            TraceStep::StartFailed { reason } => {
                self.session.report_start_failure(reason.clone());
                StepOutcome::Rejected(reason.clone())
            }
            TraceStep::Frame {
                viewer,
                hits,
                reference,
            } => {
                let frame = FrameInput {
                    viewer: *viewer,
                    hits: hits.clone(),
                    reference: *reference,
                };
                match self.session.advance_frame(&frame) {
                    Ok(summary) => StepOutcome::Frame(summary),
                    Err(e) => StepOutcome::Rejected(e.to_string()),
                }
            }
            TraceStep::Pointer(event) => {
                self.session.on_pointer_event(*event);
                StepOutcome::Applied
            }
            TraceStep::Commit => StepOutcome::Commit(self.session.commit()),
            TraceStep::PlaceAt { x, y } => {
                StepOutcome::Commit(self.session.place_at_pointer(*x, *y))
            }
            TraceStep::ScaleStep { direction } => {
                StepOutcome::Transform(self.session.step_scale(*direction))
            }
            TraceStep::RotateStep => StepOutcome::Transform(self.session.rotate_step()),
            TraceStep::Reset => StepOutcome::Transform(self.session.reset_active()),
            TraceStep::Reposition { hold } => {
                self.session.set_repositioning(*hold);
                StepOutcome::Applied
            }
            TraceStep::End => {
                self.session.end();
                StepOutcome::Applied
            }
        };

        let disposed: Vec<AnchorId> = self
            .session
            .drain_disposed()
            .into_iter()
            .map(|object| object.id)
            .collect();
        if !disposed.is_empty() {
            tracing::info!("Released {} object(s)", disposed.len());
        }

        StepReport {
            index,
            step: step.name().to_string(),
            outcome,
            disposed,
            snapshot: self.session.snapshot(),
        }
    }

    /// Apply every step back to back.
    pub fn run(&mut self, trace: &Trace) -> Vec<StepReport> {
        trace.steps.iter().map(|step| self.apply(step)).collect()
    }

    /// Apply every step, holding each frame to a real-time `fps` cadence.
    ///
    /// `emit` sees each report as soon as its step is applied; an error from
    /// it stops the replay.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::InvalidArgument`] for a non-positive `fps`, or
    /// the first error returned by `emit`.
    pub async fn run_paced<F>(&mut self, trace: &Trace, fps: f64, mut emit: F) -> ReplayResult<()>
    where
        F: FnMut(&StepReport) -> ReplayResult<()>,
    {
        let period = if fps.is_finite() && fps > 0.0 {
            Duration::try_from_secs_f64(1.0 / fps).ok()
        } else {
            None
        }
        .filter(|period| !period.is_zero())
        .ok_or_else(|| ReplayError::InvalidArgument(format!("fps out of range: {fps}")))?;

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for step in &trace.steps {
            if step.is_frame() {
                ticker.tick().await;
            }
            let report = self.apply(step);
            emit(&report)?;
        }
        Ok(())
    }
}
