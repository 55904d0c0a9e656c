use serde::{Deserialize, Serialize};

use super::{Quat, Vec3};

/// Position + orientation, laid out like `geometry_msgs/Pose`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub orientation: Quat,
}

impl Pose {
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self { position, orientation }
    }

    pub const fn identity() -> Self {
        Self { position: Vec3::zero(), orientation: Quat::identity() }
    }

    pub const fn from_position(position: Vec3) -> Self {
        Self { position, orientation: Quat::identity() }
    }
}

/// Rigid body transform (rotation, then translation).
///
/// A transform stored for edge `parent -> child` maps coordinates expressed
/// in `child` into `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RigidTransform {
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub rotation: Quat,
}

impl RigidTransform {
    pub const fn identity() -> Self {
        Self { translation: Vec3::zero(), rotation: Quat::identity() }
    }

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation: rotation.normalized() }
    }

    pub const fn from_translation(translation: Vec3) -> Self {
        Self { translation, rotation: Quat::identity() }
    }

    pub fn apply_point(&self, point: &Vec3) -> Vec3 {
        self.rotation.rotate(point) + self.translation
    }

    pub fn apply_pose(&self, pose: &Pose) -> Pose {
        Pose {
            position: self.apply_point(&pose.position),
            orientation: (self.rotation * pose.orientation).normalized(),
        }
    }

    /// `self * other`: applies `other` first, then `self`
    pub fn compose(&self, other: &RigidTransform) -> Self {
        Self {
            translation: self.rotation.rotate(&other.translation) + self.translation,
            rotation: (self.rotation * other.rotation).normalized(),
        }
    }

    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            translation: inv_rotation.rotate(&-self.translation),
            rotation: inv_rotation,
        }
    }

    /// Lerp translation, slerp rotation
    pub fn interpolate(&self, other: &RigidTransform, t: f64) -> Self {
        Self {
            translation: self.translation.lerp(&other.translation, t),
            rotation: self.rotation.slerp(&other.rotation, t).normalized(),
        }
    }
}
