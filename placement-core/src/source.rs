//! Pose source adapter.
//!
//! Normalizes whatever the tracking collaborator produced this frame into
//! [`SurfaceHit`]s. Two inputs are supported:
//!
//! ```text
//!  hit-test results ──┐
//!  + reference space  ├──► SurfaceHit { pose, normal, source }
//!  pointer + viewer ──┘      (zero or one per frame)
//! ```
//!
//! Both paths are pure functions of their inputs; "nothing usable" is a
//! `None`, never an error.

use serde::{Deserialize, Serialize};

use crate::spatial::{Pose, Vec3, Viewer};

/// Where a surface hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HitSource {
    /// Real surface hit-test from spatial tracking.
    HitTest,
    /// Synthesized from a pointer ray and a fixed-distance plane.
    FallbackRay,
}

/// A candidate placement on a real or synthesized surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceHit {
    /// Pose of the hit point.
    pub pose: Pose,
    /// Unit surface normal.
    pub normal: Vec3,
    /// Producer of this hit.
    pub source: HitSource,
}

/// One raw hit-test result from the tracking system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NativeHit {
    /// Hit pose relative to the reference space, column-major.
    pub matrix: [f32; 16],
    /// Surface normal in reference space, when the tracker reports one.
    #[serde(default)]
    pub normal: Option<Vec3>,
}

impl NativeHit {
    /// Wrap a pose as a native hit without an explicit normal.
    #[must_use]
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            matrix: pose.to_matrix().data,
            normal: None,
        }
    }

    /// Attach an explicit normal.
    #[must_use]
    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = Some(normal);
        self
    }
}

/// Converts tracking output into [`SurfaceHit`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSourceAdapter {
    fallback_distance: f32,
}

impl PoseSourceAdapter {
    /// Create an adapter whose fallback plane sits `fallback_distance` in
    /// front of the viewer.
    #[must_use]
    pub const fn new(fallback_distance: f32) -> Self {
        Self { fallback_distance }
    }

    /// Distance of the fallback plane.
    #[must_use]
    pub const fn fallback_distance(&self) -> f32 {
        self.fallback_distance
    }

    /// Normalize a single native hit into world space.
    ///
    /// Hit-test poses carry the surface normal on their local +Y axis; an
    /// explicit normal from the tracker takes precedence.
    #[must_use]
    pub fn normalize(&self, hit: &NativeHit, reference: &Pose) -> Option<SurfaceHit> {
        let local = Pose::from_matrix(&hit.matrix);
        let pose = reference.compose(&local);
        if !pose.is_usable() {
            return None;
        }

        let normal = match hit.normal {
            Some(n) => reference.orientation.rotate(n),
            None => pose.orientation.rotate(Vec3::up()),
        };
        if !normal.is_finite() || normal.length() < crate::spatial::EPSILON {
            return None;
        }

        Some(SurfaceHit {
            pose,
            normal: normal.normalize(),
            source: HitSource::HitTest,
        })
    }

    /// Normalize every usable hit, preserving tracker order.
    #[must_use]
    pub fn normalize_all(&self, hits: &[NativeHit], reference: &Pose) -> Vec<SurfaceHit> {
        hits.iter()
            .filter_map(|hit| self.normalize(hit, reference))
            .collect()
    }

    /// The first usable hit of a frame, if any.
    #[must_use]
    pub fn first_hit(&self, hits: &[NativeHit], reference: &Pose) -> Option<SurfaceHit> {
        hits.iter().find_map(|hit| self.normalize(hit, reference))
    }

    /// Synthesize a hit by casting the pointer through the viewer frustum
    /// onto the plane `fallback_distance` in front of the viewer.
    #[must_use]
    pub fn fallback_ray(&self, viewer: &Viewer, x: f32, y: f32) -> Option<SurfaceHit> {
        let ray = viewer.ray_through(x, y)?;
        let forward = viewer.forward();
        let plane_point = viewer.pose.position.add(&forward.scale(self.fallback_distance));
        let t = ray.intersect_plane(plane_point, forward)?;

        Some(SurfaceHit {
            pose: Pose::new(ray.at(t), viewer.pose.orientation),
            normal: forward.scale(-1.0),
            source: HitSource::FallbackRay,
        })
    }

    /// Fallback hit through the screen centre.
    #[must_use]
    pub fn fallback_center(&self, viewer: &Viewer) -> Option<SurfaceHit> {
        let (cx, cy) = viewer.center();
        self.fallback_ray(viewer, cx, cy)
    }
}

impl Default for PoseSourceAdapter {
    fn default() -> Self {
        Self::new(crate::EngineConfig::default().fallback_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Quat;
    use std::f32::consts::FRAC_PI_2;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    /// A hit on a wall facing +Z: the pose's +Y axis must point along +Z.
    fn wall_hit(position: Vec3) -> NativeHit {
        let orientation = Quat::from_axis_angle(Vec3::right(), FRAC_PI_2);
        NativeHit::from_pose(&Pose::new(position, orientation))
    }

    #[test]
    fn test_normal_from_pose_up_axis() {
        let adapter = PoseSourceAdapter::default();
        let hit = adapter
            .normalize(&wall_hit(Vec3::new(0.0, 1.0, -2.0)), &Pose::identity())
            .expect("usable hit");

        assert_eq!(hit.source, HitSource::HitTest);
        assert!(approx_eq(hit.normal.z, 1.0));
        assert!(approx_eq(hit.normal.y, 0.0));
        assert!(approx_eq(hit.pose.position.z, -2.0));
    }

    #[test]
    fn test_explicit_normal_wins() {
        let adapter = PoseSourceAdapter::default();
        let native = NativeHit::from_pose(&Pose::identity()).with_normal(Vec3::new(0.0, 0.0, 2.0));
        let hit = adapter
            .normalize(&native, &Pose::identity())
            .expect("usable hit");
        assert!(approx_eq(hit.normal.z, 1.0));
    }

    #[test]
    fn test_reference_space_is_applied() {
        let adapter = PoseSourceAdapter::default();
        let reference = Pose::at(Vec3::new(0.0, 1.6, 0.0));
        let hit = adapter
            .normalize(&wall_hit(Vec3::new(0.0, 0.0, -2.0)), &reference)
            .expect("usable hit");
        assert!(approx_eq(hit.pose.position.y, 1.6));
    }

    #[test]
    fn test_empty_results_are_no_hit() {
        let adapter = PoseSourceAdapter::default();
        assert!(adapter.first_hit(&[], &Pose::identity()).is_none());
    }

    #[test]
    fn test_non_finite_hits_are_skipped() {
        let adapter = PoseSourceAdapter::default();
        let mut broken = wall_hit(Vec3::zero());
        broken.matrix[12] = f32::INFINITY;
        let good = wall_hit(Vec3::new(1.0, 0.0, -2.0));

        let hits = adapter.normalize_all(&[broken, good], &Pose::identity());
        assert_eq!(hits.len(), 1);
        assert!(approx_eq(hits[0].pose.position.x, 1.0));
    }

    #[test]
    fn test_invalid_reference_is_no_hit() {
        let adapter = PoseSourceAdapter::default();
        let reference = Pose {
            valid: false,
            ..Pose::identity()
        };
        assert!(adapter.normalize(&wall_hit(Vec3::zero()), &reference).is_none());
    }

    #[test]
    fn test_fallback_center_lands_at_distance() {
        let adapter = PoseSourceAdapter::new(2.0);
        let hit = adapter
            .fallback_center(&Viewer::default())
            .expect("fallback hit");

        assert_eq!(hit.source, HitSource::FallbackRay);
        assert!(approx_eq(hit.pose.position.x, 0.0));
        assert!(approx_eq(hit.pose.position.y, 0.0));
        assert!(approx_eq(hit.pose.position.z, -2.0));
        assert!(approx_eq(hit.normal.z, 1.0));
        assert_eq!(hit.pose.orientation, Quat::identity());
    }

    #[test]
    fn test_fallback_off_center_stays_on_plane() {
        let adapter = PoseSourceAdapter::new(2.0);
        let viewer = Viewer::default();
        let hit = adapter.fallback_ray(&viewer, 700.0, 50.0).expect("hit");
        assert!(approx_eq(hit.pose.position.z, -2.0));
        assert!(hit.pose.position.x > 0.0);
        assert!(hit.pose.position.y > 0.0);
    }

    #[test]
    fn test_fallback_without_viewport_is_no_hit() {
        let adapter = PoseSourceAdapter::new(2.0);
        let viewer = Viewer {
            height: 0.0,
            ..Viewer::default()
        };
        assert!(adapter.fallback_center(&viewer).is_none());
    }
}
