use std::ops::Mul;

use serde::{Deserialize, Serialize};

use super::{Mat33, Vec3};

/// Unit quaternion orientation, stored as `{x, y, z, w}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default = "one")]
    pub w: f64,
}

fn one() -> f64 {
    1.
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quat {
    pub const fn identity() -> Self {
        Self { x: 0., y: 0., z: 0., w: 1. }
    }

    pub const fn from_xyzw(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians about `axis`
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let mag = axis.mag();
        if mag == 0. {
            return Self::identity();
        }
        let (s, c) = (angle * 0.5).sin_cos();
        let axis = axis.scale(s / mag);
        Self { x: axis.0, y: axis.1, z: axis.2, w: c }
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Scale to unit length. A degenerate (zero) quaternion becomes the identity.
    pub fn normalized(&self) -> Self {
        let n = self.norm();
        if n == 0. || !n.is_finite() {
            return Self::identity();
        }
        let r = n.recip();
        Self { x: self.x * r, y: self.y * r, z: self.z * r, w: self.w * r }
    }

    pub const fn conjugate(&self) -> Self {
        Self { x: -self.x, y: -self.y, z: -self.z, w: self.w }
    }

    /// Inverse rotation (assumes unit length)
    pub const fn inverse(&self) -> Self {
        self.conjugate()
    }

    pub fn dot(&self, rhs: &Quat) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w
    }

    pub fn to_matrix(&self) -> Mat33 {
        Mat33::from_quaternion([self.x, self.y, self.z, self.w])
    }

    /// Rotate a vector
    pub fn rotate(&self, v: &Vec3) -> Vec3 {
        &self.to_matrix() * v
    }

    /// Heading about +z, in radians
    pub fn yaw(&self) -> f64 {
        f64::atan2(
            2. * (self.w * self.z + self.x * self.y),
            1. - 2. * (self.y * self.y + self.z * self.z),
        )
    }

    /// Spherical interpolation along the shorter arc
    pub fn slerp(&self, rhs: &Quat, t: f64) -> Self {
        let mut cos_theta = self.dot(rhs);
        let mut end = *rhs;
        if cos_theta < 0. {
            cos_theta = -cos_theta;
            end = Self { x: -rhs.x, y: -rhs.y, z: -rhs.z, w: -rhs.w };
        }

        // Nearly parallel: fall back to nlerp
        if cos_theta > 1. - 1e-9 {
            return Self {
                x: self.x + (end.x - self.x) * t,
                y: self.y + (end.y - self.y) * t,
                z: self.z + (end.z - self.z) * t,
                w: self.w + (end.w - self.w) * t,
            }.normalized();
        }

        let theta = cos_theta.acos();
        let sin_theta = theta.sin();
        let a = ((1. - t) * theta).sin() / sin_theta;
        let b = (t * theta).sin() / sin_theta;
        Self {
            x: self.x * a + end.x * b,
            y: self.y * a + end.y * b,
            z: self.z * a + end.z * b,
            w: self.w * a + end.w * b,
        }
    }
}

/// Hamilton product (`self * rhs` applies `rhs` first)
impl Mul<Quat> for Quat {
    type Output = Quat;

    fn mul(self, rhs: Quat) -> Self::Output {
        Quat {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }
}
