//! Reticle tracking: the "where would a placement land right now" indicator.

use serde::{Deserialize, Serialize};

use crate::source::{HitSource, SurfaceHit};
use crate::spatial::Pose;

/// Snapshot of the reticle for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReticleState {
    /// Whether the reticle should be drawn.
    pub visible: bool,
    /// Last accepted pose. Kept while hidden so the indicator does not snap
    /// to stale data when it reappears.
    pub pose: Pose,
}

impl Default for ReticleState {
    fn default() -> Self {
        Self {
            visible: false,
            pose: Pose::identity(),
        }
    }
}

/// Filters surface hits down to walls and keeps the reticle pose.
#[derive(Debug, Clone)]
pub struct ReticleTracker {
    state: ReticleState,
    last_hit: Option<SurfaceHit>,
    vertical_normal_threshold: f32,
}

impl ReticleTracker {
    /// Create a tracker accepting hits whose normal has `|y|` below `threshold`.
    #[must_use]
    pub fn new(vertical_normal_threshold: f32) -> Self {
        Self {
            state: ReticleState::default(),
            last_hit: None,
            vertical_normal_threshold,
        }
    }

    /// Whether a hit passes the surface-orientation policy.
    ///
    /// Fallback hits are always accepted; they exist precisely for sessions
    /// without real surfaces.
    #[must_use]
    pub fn accepts(&self, hit: &SurfaceHit) -> bool {
        match hit.source {
            HitSource::FallbackRay => hit.pose.is_usable(),
            HitSource::HitTest => {
                hit.pose.is_usable()
                    && hit.normal.y.abs() < self.vertical_normal_threshold
            }
        }
    }

    /// Consume this frame's hit (or lack of one).
    ///
    /// Returns whether the reticle is visible afterwards.
    pub fn update(&mut self, hit: Option<&SurfaceHit>) -> bool {
        match hit {
            Some(hit) if self.accepts(hit) => {
                if !self.state.visible {
                    tracing::debug!("Reticle acquired ({:?})", hit.source);
                }
                self.state.pose = hit.pose;
                self.state.visible = true;
                self.last_hit = Some(*hit);
            }
            Some(_) | None => {
                if self.state.visible {
                    tracing::debug!("Reticle lost");
                }
                self.state.visible = false;
            }
        }
        self.state.visible
    }

    /// Consume all candidates of a frame, accepting the first wall.
    pub fn update_from_candidates(&mut self, hits: &[SurfaceHit]) -> bool {
        let accepted = hits.iter().find(|hit| self.accepts(hit));
        self.update(accepted)
    }

    /// Hide the reticle (tracking loss or session end).
    pub fn reset(&mut self) {
        self.state.visible = false;
    }

    /// Current reticle snapshot.
    #[must_use]
    pub const fn state(&self) -> ReticleState {
        self.state
    }

    /// Whether the reticle is visible.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.state.visible
    }

    /// The last accepted hit, while the reticle is visible.
    #[must_use]
    pub fn current_hit(&self) -> Option<&SurfaceHit> {
        if self.state.visible {
            self.last_hit.as_ref()
        } else {
            None
        }
    }
}

impl Default for ReticleTracker {
    fn default() -> Self {
        Self::new(crate::EngineConfig::default().vertical_normal_threshold)
    }
}
