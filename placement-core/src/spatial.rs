//! Spatial math shared by the placement engine.
//!
//! Conventions follow the hit-test APIs the engine is fed from:
//!
//! ```text
//!          +Y (up)
//!           │
//!           │
//!           ●──── +X (right)
//!          ╱
//!         ╱
//!       +Z (towards the viewer; the camera looks down -Z)
//! ```
//!
//! Matrices are column-major, screen coordinates are pixels with the origin
//! at the top-left corner and Y growing downwards.

use serde::{Deserialize, Serialize};

/// Below this magnitude a divisor is treated as zero.
pub const EPSILON: f32 = 1e-6;

/// A 3D vector for positions and directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vec3 {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Unit vector pointing right (X+).
    #[must_use]
    pub const fn right() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Unit vector pointing up (Y+).
    #[must_use]
    pub const fn up() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// Unit vector pointing forward (Z-).
    #[must_use]
    pub const fn forward() -> Self {
        Self::new(0.0, 0.0, -1.0)
    }

    /// Calculate the length (magnitude) of the vector.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Normalize the vector to unit length. Zero vectors are returned as-is.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self.scale(1.0 / len)
        } else {
            *self
        }
    }

    /// Cross product of two vectors.
    #[must_use]
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Subtract two vectors.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Add two vectors.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    /// Scale vector by a scalar.
    #[must_use]
    pub fn scale(&self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::zero()
    }
}

/// A rotation quaternion (`x`, `y`, `z` vector part, `w` scalar part).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
    /// W (scalar) component.
    pub w: f32,
}

impl Quat {
    /// Create a quaternion from raw components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// The identity rotation.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Rotation of `angle` radians about `axis`.
    #[must_use]
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let axis = axis.normalize();
        let (sin, cos) = (angle * 0.5).sin_cos();
        Self::new(axis.x * sin, axis.y * sin, axis.z * sin, cos)
    }

    /// Extract the rotation from a column-major 4x4 matrix.
    #[must_use]
    pub fn from_rotation_matrix(m: &[f32; 16]) -> Self {
        let (m00, m10, m20) = (m[0], m[1], m[2]);
        let (m01, m11, m21) = (m[4], m[5], m[6]);
        let (m02, m12, m22) = (m[8], m[9], m[10]);
        let trace = m00 + m11 + m22;

        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new((m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s, 0.25 * s)
        } else if m00 > m11 && m00 > m22 {
            let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0;
            Self::new(0.25 * s, (m01 + m10) / s, (m02 + m20) / s, (m21 - m12) / s)
        } else if m11 > m22 {
            let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0;
            Self::new((m01 + m10) / s, 0.25 * s, (m12 + m21) / s, (m02 - m20) / s)
        } else {
            let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0;
            Self::new((m02 + m20) / s, (m12 + m21) / s, 0.25 * s, (m10 - m01) / s)
        };
        q.normalize()
    }

    /// Hamilton product `self * other` (apply `other` first).
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        Self::new(
            self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
            self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
        )
    }

    /// The inverse rotation (for unit quaternions).
    #[must_use]
    pub fn conjugate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Normalize to unit length. Degenerate quaternions become the identity.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if len > EPSILON && len.is_finite() {
            Self::new(self.x / len, self.y / len, self.z / len, self.w / len)
        } else {
            Self::identity()
        }
    }

    /// Rotate a vector by this quaternion.
    #[must_use]
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(&v).scale(2.0);
        v.add(&t.scale(self.w)).add(&u.cross(&t))
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

/// A 4x4 matrix for transformations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    /// Matrix data in column-major order.
    pub data: [f32; 16],
}

impl Mat4 {
    /// Create identity matrix.
    #[must_use]
    pub fn identity() -> Self {
        #[rustfmt::skip]
        let data = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { data }
    }

    /// Compose translation, rotation and uniform scale (`T * R * S`).
    #[must_use]
    pub fn from_translation_rotation_scale(translation: Vec3, rotation: Quat, scale: f32) -> Self {
        let Quat { x, y, z, w } = rotation;
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);

        #[rustfmt::skip]
        let data = [
            (1.0 - 2.0 * (yy + zz)) * scale, 2.0 * (xy + wz) * scale, 2.0 * (xz - wy) * scale, 0.0,
            2.0 * (xy - wz) * scale, (1.0 - 2.0 * (xx + zz)) * scale, 2.0 * (yz + wx) * scale, 0.0,
            2.0 * (xz + wy) * scale, 2.0 * (yz - wx) * scale, (1.0 - 2.0 * (xx + yy)) * scale, 0.0,
            translation.x, translation.y, translation.z, 1.0,
        ];
        Self { data }
    }

    /// Translation part (column 3).
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.data[12], self.data[13], self.data[14])
    }

    /// Multiply two matrices.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        let mut result = [0.0f32; 16];

        for row in 0..4 {
            for col in 0..4 {
                for k in 0..4 {
                    result[col * 4 + row] += self.data[k * 4 + row] * other.data[col * 4 + k];
                }
            }
        }

        Self { data: result }
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

/// A position and orientation in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in world units.
    pub position: Vec3,
    /// Orientation.
    pub orientation: Quat,
    /// Whether the producer considered this pose trustworthy.
    pub valid: bool,
}

impl Pose {
    /// Create a valid pose.
    #[must_use]
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
            valid: true,
        }
    }

    /// The identity pose at the origin.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new(Vec3::zero(), Quat::identity())
    }

    /// A valid pose at `position` with identity orientation.
    #[must_use]
    pub const fn at(position: Vec3) -> Self {
        Self::new(position, Quat::identity())
    }

    /// Decompose a rigid column-major matrix.
    #[must_use]
    pub fn from_matrix(matrix: &[f32; 16]) -> Self {
        let valid = matrix.iter().all(|v| v.is_finite());
        Self {
            position: Vec3::new(matrix[12], matrix[13], matrix[14]),
            orientation: Quat::from_rotation_matrix(matrix),
            valid,
        }
    }

    /// Column-major matrix for this pose at unit scale.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_translation_rotation_scale(self.position, self.orientation, 1.0)
    }

    /// Express a pose given relative to `self` in the frame `self` lives in.
    #[must_use]
    pub fn compose(&self, local: &Self) -> Self {
        Self {
            position: self.position.add(&self.orientation.rotate(local.position)),
            orientation: self.orientation.mul(&local.orientation).normalize(),
            valid: self.valid && local.valid,
        }
    }

    /// Valid and numerically sound.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.valid && self.position.is_finite() && self.orientation.is_finite()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// A half-line in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Intersect with the plane through `point` with normal `normal`.
    ///
    /// Returns the distance along the ray, or `None` when the ray is parallel
    /// to the plane or the plane lies behind the origin.
    #[must_use]
    pub fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<f32> {
        let denom = self.direction.dot(&normal);
        if denom.abs() < EPSILON {
            return None;
        }
        let t = point.sub(&self.origin).dot(&normal) / denom;
        (t.is_finite() && t > 0.0).then_some(t)
    }

    /// Point at distance `t` along the ray.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin.add(&self.direction.scale(t))
    }
}

/// The device camera the user is looking through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewer {
    /// Camera pose in world space.
    pub pose: Pose,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Viewport width in pixels.
    pub width: f32,
    /// Viewport height in pixels.
    pub height: f32,
    /// Near clipping distance.
    pub near: f32,
}

impl Viewer {
    /// Create a viewer with the given pose and viewport size.
    #[must_use]
    pub fn new(pose: Pose, width: f32, height: f32) -> Self {
        Self {
            pose,
            width,
            height,
            ..Self::default()
        }
    }

    /// View direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.pose.orientation.rotate(Vec3::forward())
    }

    /// Screen-right direction in world space.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.pose.orientation.rotate(Vec3::right())
    }

    /// Screen-up direction in world space.
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.pose.orientation.rotate(Vec3::up())
    }

    /// Screen centre in pixels.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.width * 0.5, self.height * 0.5)
    }

    /// Pixels per world unit at unit depth.
    #[must_use]
    pub fn focal_length_px(&self) -> f32 {
        self.height * 0.5 / (self.fov_y * 0.5).tan()
    }

    fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0 && self.fov_y > 0.0) || !self.pose.is_usable()
    }

    /// World-space ray through the pixel `(x, y)`.
    #[must_use]
    pub fn ray_through(&self, x: f32, y: f32) -> Option<Ray> {
        if self.is_degenerate() || !x.is_finite() || !y.is_finite() {
            return None;
        }
        let half_h = (self.fov_y * 0.5).tan();
        let half_w = half_h * self.width / self.height;
        let ndc_x = 2.0 * x / self.width - 1.0;
        let ndc_y = 1.0 - 2.0 * y / self.height;
        let local = Vec3::new(ndc_x * half_w, ndc_y * half_h, -1.0).normalize();

        Some(Ray {
            origin: self.pose.position,
            direction: self.pose.orientation.rotate(local).normalize(),
        })
    }

    /// Project a world point to pixels, returning `(x, y, depth)`.
    ///
    /// Points behind the near plane do not project.
    #[must_use]
    pub fn project(&self, point: Vec3) -> Option<(f32, f32, f32)> {
        if self.is_degenerate() {
            return None;
        }
        let local = self
            .pose
            .orientation
            .conjugate()
            .rotate(point.sub(&self.pose.position));
        let depth = -local.z;
        if depth < self.near {
            return None;
        }
        let focal = self.focal_length_px();
        let x = self.width * 0.5 + local.x / depth * focal;
        let y = self.height * 0.5 - local.y / depth * focal;
        Some((x, y, depth))
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self {
            pose: Pose::identity(),
            fov_y: 70.0_f32.to_radians(),
            width: 800.0,
            height: 600.0,
            near: 0.01,
        }
    }
}
