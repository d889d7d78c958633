//! Engine configuration.
//!
//! The knobs that differed between viewer variants (clamp range, pan
//! sensitivity, history length) all live here.

use std::f32::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use crate::{PlacementError, PlacementResult};

/// Default number of objects kept before FIFO eviction.
pub const DEFAULT_MAX_OBJECTS: usize = 10;

/// Configuration for a placement session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of anchored objects kept at once.
    pub max_objects: usize,
    /// Lower scale bound.
    pub min_scale: f32,
    /// Upper scale bound.
    pub max_scale: f32,
    /// Hits whose normal has `|y|` at or above this are not walls.
    pub vertical_normal_threshold: f32,
    /// World units per screen pixel of one-finger drag.
    pub pan_sensitivity: f32,
    /// Distance of the fallback placement plane in front of the viewer.
    pub fallback_distance: f32,
    /// Artwork width and height in world units at scale 1.0.
    pub object_extent: [f32; 2],
    /// Multiplier applied by the "scale up" action.
    pub scale_step_up: f32,
    /// Multiplier applied by the "scale down" action.
    pub scale_step_down: f32,
    /// Radians added by the "rotate" action.
    pub rotation_step: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_objects: DEFAULT_MAX_OBJECTS,
            min_scale: 0.3,
            max_scale: 3.0,
            vertical_normal_threshold: 0.2,
            pan_sensitivity: 0.01,
            fallback_distance: 2.0,
            object_extent: [0.5, 0.75],
            scale_step_up: 1.2,
            scale_step_down: 0.8,
            rotation_step: FRAC_PI_4,
        }
    }
}

impl EngineConfig {
    /// Set the object history length.
    #[must_use]
    pub fn with_max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = max_objects;
        self
    }

    /// Set the scale clamp range.
    #[must_use]
    pub fn with_scale_range(mut self, min_scale: f32, max_scale: f32) -> Self {
        self.min_scale = min_scale;
        self.max_scale = max_scale;
        self
    }

    /// Set the wall-detection threshold.
    #[must_use]
    pub fn with_vertical_normal_threshold(mut self, threshold: f32) -> Self {
        self.vertical_normal_threshold = threshold;
        self
    }

    /// Set the pan sensitivity.
    #[must_use]
    pub fn with_pan_sensitivity(mut self, sensitivity: f32) -> Self {
        self.pan_sensitivity = sensitivity;
        self
    }

    /// Set the fallback plane distance.
    #[must_use]
    pub fn with_fallback_distance(mut self, distance: f32) -> Self {
        self.fallback_distance = distance;
        self
    }

    /// Clamp a scale into the configured range.
    #[must_use]
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        if scale.is_nan() {
            return self.min_scale.max(1.0_f32.min(self.max_scale));
        }
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> PlacementResult<()> {
        let invalid = |msg: String| {
            tracing::warn!("Rejected engine config: {msg}");
            Err(PlacementError::InvalidConfig(msg))
        };

        if self.max_objects < 1 {
            return invalid("max_objects must be at least 1".to_string());
        }
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return invalid(format!("min_scale must be > 0, got {}", self.min_scale));
        }
        if !(self.max_scale.is_finite() && self.max_scale >= self.min_scale) {
            return invalid(format!(
                "max_scale must be >= min_scale ({}), got {}",
                self.min_scale, self.max_scale
            ));
        }
        if !(0.0..=1.0).contains(&self.vertical_normal_threshold) {
            return invalid(format!(
                "vertical_normal_threshold must be within [0, 1], got {}",
                self.vertical_normal_threshold
            ));
        }
        if !(self.pan_sensitivity.is_finite() && self.pan_sensitivity > 0.0) {
            return invalid(format!(
                "pan_sensitivity must be > 0, got {}",
                self.pan_sensitivity
            ));
        }
        if !(self.fallback_distance.is_finite() && self.fallback_distance > 0.0) {
            return invalid(format!(
                "fallback_distance must be > 0, got {}",
                self.fallback_distance
            ));
        }
        if !self
            .object_extent
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
        {
            return invalid(format!(
                "object_extent must be positive, got {:?}",
                self.object_extent
            ));
        }
        for (name, step) in [
            ("scale_step_up", self.scale_step_up),
            ("scale_step_down", self.scale_step_down),
        ] {
            if !(step.is_finite() && step > 0.0) {
                return invalid(format!("{name} must be > 0, got {step}"));
            }
        }
        if !self.rotation_step.is_finite() {
            return invalid("rotation_step must be finite".to_string());
        }
        Ok(())
    }
}
