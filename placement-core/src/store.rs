//! Bounded, insertion-ordered storage for placed artwork.
//!
//! ```text
//!  commit ──► [ #3 | #4 | #5 | ... | #12 ] ──► evicted (oldest first)
//!                                              └─► disposal queue ──► renderer
//! ```
//!
//! Eviction is FIFO on `created_at`, a per-store counter, so two commits in
//! the same clock tick still have a strict order.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reticle::ReticleState;
use crate::spatial::{Mat4, Pose, Quat, Vec3};

/// Unique identifier for an anchored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorId(Uuid);

impl AnchorId {
    /// Create a new unique anchor ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize an angle into `[0, 2π)`.
#[must_use]
pub fn normalize_angle(radians: f32) -> f32 {
    if !radians.is_finite() {
        return 0.0;
    }
    let wrapped = radians.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// A virtual object bound to a world pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchoredObject {
    /// Unique identifier.
    pub id: AnchorId,
    /// Current pose.
    pub pose: Pose,
    /// Pose at commit time, restored by a reset.
    pub placed_pose: Pose,
    /// Uniform scale, kept inside the configured clamp range.
    pub scale: f32,
    /// In-plane rotation in radians (unbounded).
    pub rotation_z: f32,
    /// Monotonic creation order within the store.
    pub created_at: u64,
}

impl AnchoredObject {
    fn new(pose: Pose, created_at: u64) -> Self {
        Self {
            id: AnchorId::new(),
            pose,
            placed_pose: pose,
            scale: 1.0,
            rotation_z: 0.0,
            created_at,
        }
    }

    /// Rotation normalized into `[0, 2π)` for display.
    #[must_use]
    pub fn display_rotation(&self) -> f32 {
        normalize_angle(self.rotation_z)
    }

    /// Model matrix: anchor pose, then in-plane rotation, then scale.
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        let twist = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), self.rotation_z);
        let orientation = self.pose.orientation.mul(&twist).normalize();
        Mat4::from_translation_rotation_scale(self.pose.position, orientation, self.scale)
    }
}

/// Outcome of a placement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// A new object was anchored.
    Placed(AnchorId),
    /// The reticle was not visible; nothing happened.
    NothingToPlace,
    /// A manipulation gesture is still in progress; nothing happened.
    GestureInProgress,
    /// No session is running; nothing happened.
    SessionInactive,
}

impl CommitOutcome {
    /// Whether an object was placed.
    #[must_use]
    pub const fn is_placed(&self) -> bool {
        matches!(self, Self::Placed(_))
    }
}

/// Bounded FIFO collection of anchored objects.
#[derive(Debug, Clone)]
pub struct PlacementStore {
    objects: VecDeque<AnchoredObject>,
    capacity: usize,
    next_sequence: u64,
    disposed: Vec<AnchoredObject>,
}

impl PlacementStore {
    /// Create a store holding at most `capacity` objects (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            objects: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
            disposed: Vec::new(),
        }
    }

    /// Place a new object at the reticle pose, if the reticle is visible.
    pub fn commit(&mut self, reticle: &ReticleState) -> CommitOutcome {
        if !reticle.visible {
            tracing::debug!("Commit ignored: reticle not visible");
            return CommitOutcome::NothingToPlace;
        }
        CommitOutcome::Placed(self.insert(reticle.pose))
    }

    /// Append a new object at `pose`, evicting the oldest when full.
    pub fn insert(&mut self, pose: Pose) -> AnchorId {
        let object = AnchoredObject::new(pose, self.next_sequence);
        self.next_sequence += 1;
        let id = object.id;

        self.objects.push_back(object);
        tracing::info!(
            "Anchored object {id} at ({:.3}, {:.3}, {:.3})",
            pose.position.x,
            pose.position.y,
            pose.position.z
        );

        while self.objects.len() > self.capacity {
            if let Some(oldest) = self.objects.pop_front() {
                tracing::info!("Evicting oldest object {} (capacity {})", oldest.id, self.capacity);
                self.disposed.push(oldest);
            }
        }
        id
    }

    /// Remove an object and queue it for disposal.
    ///
    /// Returns `false` if the object is not stored.
    pub fn evict(&mut self, id: AnchorId) -> bool {
        let Some(index) = self.objects.iter().position(|o| o.id == id) else {
            return false;
        };
        if let Some(object) = self.objects.remove(index) {
            tracing::info!("Evicting object {id}");
            self.disposed.push(object);
        }
        true
    }

    /// Queue every stored object for disposal.
    pub fn dispose_all(&mut self) {
        if !self.objects.is_empty() {
            tracing::info!("Disposing {} anchored objects", self.objects.len());
        }
        self.disposed.extend(self.objects.drain(..));
    }

    /// Take the objects whose renderer resources must be released.
    ///
    /// Each evicted object is returned by exactly one call.
    pub fn drain_disposed(&mut self) -> Vec<AnchoredObject> {
        std::mem::take(&mut self.disposed)
    }

    /// Number of objects awaiting disposal.
    #[must_use]
    pub fn pending_disposals(&self) -> usize {
        self.disposed.len()
    }

    /// Get an object by ID.
    #[must_use]
    pub fn get(&self, id: AnchorId) -> Option<&AnchoredObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Get a mutable reference to an object by ID.
    pub fn get_mut(&mut self, id: AnchorId) -> Option<&mut AnchoredObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Objects in insertion order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &AnchoredObject> {
        self.objects.iter()
    }

    /// The most recently placed object.
    #[must_use]
    pub fn newest(&self) -> Option<&AnchoredObject> {
        self.objects.back()
    }

    /// Maximum number of stored objects.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for PlacementStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_OBJECTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible_at(position: Vec3) -> ReticleState {
        ReticleState {
            visible: true,
            pose: Pose::at(position),
        }
    }

    #[test]
    fn test_commit_requires_visible_reticle() {
        let mut store = PlacementStore::default();
        let outcome = store.commit(&ReticleState::default());
        assert_eq!(outcome, CommitOutcome::NothingToPlace);
        assert!(store.is_empty());
    }

    #[test]
    fn test_commit_creates_default_object() {
        let mut store = PlacementStore::default();
        let outcome = store.commit(&visible_at(Vec3::new(0.0, 0.0, -2.0)));

        let CommitOutcome::Placed(id) = outcome else {
            panic!("expected placement, got {outcome:?}");
        };
        let object = store.get(id).expect("stored");
        assert!((object.scale - 1.0).abs() < f32::EPSILON);
        assert!(object.rotation_z.abs() < f32::EPSILON);
        assert_eq!(object.pose, object.placed_pose);
    }

    #[test]
    fn test_commit_twice_creates_two_objects() {
        let mut store = PlacementStore::default();
        let reticle = visible_at(Vec3::new(0.0, 0.0, -2.0));
        let first = store.commit(&reticle);
        let second = store.commit(&reticle);

        assert_ne!(first, second);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_fifo_eviction_and_single_disposal() {
        let mut store = PlacementStore::new(3);
        let ids: Vec<_> = (0..5)
            .map(|i| store.insert(Pose::at(Vec3::new(i as f32, 0.0, -2.0))))
            .collect();

        assert_eq!(store.len(), 3);
        let kept: Vec<_> = store.iter().map(|o| o.id).collect();
        assert_eq!(kept, ids[2..].to_vec());

        let disposed: Vec<_> = store.drain_disposed().into_iter().map(|o| o.id).collect();
        assert_eq!(disposed, ids[..2].to_vec());
        assert!(store.drain_disposed().is_empty());
    }

    #[test]
    fn test_created_at_is_strictly_increasing() {
        let mut store = PlacementStore::new(4);
        for _ in 0..6 {
            store.insert(Pose::identity());
        }
        let stamps: Vec<_> = store.iter().map(|o| o.created_at).collect();
        assert_eq!(stamps, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_evict_specific_object() {
        let mut store = PlacementStore::default();
        let a = store.insert(Pose::identity());
        let b = store.insert(Pose::identity());

        assert!(store.evict(a));
        assert!(!store.evict(a));
        assert_eq!(store.len(), 1);
        assert!(store.get(b).is_some());
        assert_eq!(store.pending_disposals(), 1);
    }

    #[test]
    fn test_dispose_all() {
        let mut store = PlacementStore::default();
        store.insert(Pose::identity());
        store.insert(Pose::identity());
        store.dispose_all();

        assert!(store.is_empty());
        assert_eq!(store.drain_disposed().len(), 2);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let store = PlacementStore::new(0);
        assert_eq!(store.capacity(), 1);
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(-std::f32::consts::FRAC_PI_2) - 3.0 * std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert!((normalize_angle(TAU + 0.5) - 0.5).abs() < 1e-5);
        assert!(normalize_angle(-1e-9) < TAU);
        assert!(normalize_angle(f32::NAN).abs() < f32::EPSILON);
    }

    #[test]
    fn test_model_matrix_applies_scale() {
        let mut store = PlacementStore::default();
        let id = store.insert(Pose::at(Vec3::new(1.0, 2.0, -3.0)));
        let object = store.get_mut(id).expect("stored");
        object.scale = 2.0;

        let m = object.model_matrix();
        assert!((m.data[0] - 2.0).abs() < 1e-5);
        assert!((m.translation().z + 3.0).abs() < 1e-5);
    }
}
