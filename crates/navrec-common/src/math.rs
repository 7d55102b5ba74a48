//! SE(3) pose helpers.
//!
//! Just enough rigid-body math to compute the relative transform between
//! two waypoint poses: quaternion composition, rotation of a vector, and
//! pose inverse. Rotations are unit quaternions; no normalization is
//! performed on wire input beyond what the robot guarantees.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Unit quaternion, `w` first to match the wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quat {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Hamilton product `self * other`.
    pub fn mul(&self, other: &Quat) -> Quat {
        Quat {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }

    /// Inverse. Equals the conjugate for unit quaternions.
    pub fn inverse(&self) -> Quat {
        Quat {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Rotates a vector by this quaternion (`q v q⁻¹`).
    pub fn rotate(&self, v: &Vec3) -> Vec3 {
        let qv = Quat::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(&qv).mul(&self.inverse());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

/// A rigid-body transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SE3Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl SE3Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// Composes two transforms: `self * other`.
    pub fn mul(&self, other: &SE3Pose) -> SE3Pose {
        SE3Pose {
            position: {
                let rotated = self.rotation.rotate(&other.position);
                Vec3::new(
                    self.position.x + rotated.x,
                    self.position.y + rotated.y,
                    self.position.z + rotated.z,
                )
            },
            rotation: self.rotation.mul(&other.rotation),
        }
    }

    /// Inverse transform.
    pub fn inverse(&self) -> SE3Pose {
        let inv_rot = self.rotation.inverse();
        let rotated = inv_rot.rotate(&self.position);
        SE3Pose {
            position: Vec3::new(-rotated.x, -rotated.y, -rotated.z),
            rotation: inv_rot,
        }
    }
}

/// Relative transform between two poses expressed in a common frame.
///
/// With `from` and `to` both mapping their local frame onto the odometry
/// frame, the edge transform is `from * to⁻¹`.
pub fn relative_transform(from: &SE3Pose, to: &SE3Pose) -> SE3Pose {
    from.mul(&to.inverse())
}
