use std::ops::{Add, Mul, Sub, AddAssign, Neg};

use serde::{Deserialize, Serialize};

/// 3 element vector (position, translation or box extent)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec3Fields", into = "Vec3Fields")]
pub struct Vec3(pub f64, pub f64, pub f64);

/// Wire layout of [Vec3] (`{x, y, z}`, like a geometry_msgs point)
#[derive(Serialize, Deserialize)]
struct Vec3Fields {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    z: f64,
}

impl From<Vec3Fields> for Vec3 {
    fn from(value: Vec3Fields) -> Self {
        Self(value.x, value.y, value.z)
    }
}

impl From<Vec3> for Vec3Fields {
    fn from(value: Vec3) -> Self {
        Self { x: value.0, y: value.1, z: value.2 }
    }
}

impl Vec3 {
    /// Create from constant values
    pub const fn of(x: f64, y: f64, z: f64) -> Self {
        Self(x, y, z)
    }

    /// Vector of all zeroes
    pub const fn zero() -> Self {
        Self(0., 0., 0.)
    }

    pub const fn x(&self) -> f64 {
        self.0
    }

    pub const fn y(&self) -> f64 {
        self.1
    }

    pub const fn z(&self) -> f64 {
        self.2
    }

    /// Cross product
    pub fn cross(&self, rhs: &Vec3) -> Self {
        Self(
            self.1 * rhs.2 - self.2 * rhs.1,
            self.2 * rhs.0 - self.0 * rhs.2,
            self.0 * rhs.1 - self.1 * rhs.0,
        )
    }

    /// Magnitude squared
    pub fn mag_sq(&self) -> f64 {
        (self.0 * self.0) + (self.1 * self.1) + (self.2 * self.2)
    }

    /// Vector magnitude
    pub fn mag(&self) -> f64 {
        self.mag_sq().sqrt()
    }

    /// Scale vector
    pub fn scale(&self, rhs: f64) -> Self {
        Self(self.0 * rhs, self.1 * rhs, self.2 * rhs)
    }

    /// Dot product
    pub fn dot(&self, rhs: &Vec3) -> f64 {
        (self.0 * rhs.0) + (self.1 * rhs.1) + (self.2 * rhs.2)
    }

    /// Linear interpolation (`t = 0` is `self`, `t = 1` is `rhs`)
    pub fn lerp(&self, rhs: &Vec3, t: f64) -> Self {
        self + &(rhs - self).scale(t)
    }

    /// Are all components finite?
    pub fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite() && self.2.is_finite()
    }
}

/// Vector addition
impl Add<Vec3> for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Self::Output {
        Self(self.0 + rhs.0, self.1 + rhs.1, self.2 + rhs.2)
    }
}

/// Vector addition
impl Add<&Vec3> for &Vec3 {
    type Output = Vec3;

    fn add(self, rhs: &Vec3) -> Self::Output {
        Vec3(self.0 + rhs.0, self.1 + rhs.1, self.2 + rhs.2)
    }
}

/// Vector subtraction
impl Sub<Vec3> for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Self::Output {
        Vec3(self.0 - rhs.0, self.1 - rhs.1, self.2 - rhs.2)
    }
}

/// Vector subtraction
impl Sub<&Vec3> for &Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: &Vec3) -> Self::Output {
        Vec3(self.0 - rhs.0, self.1 - rhs.1, self.2 - rhs.2)
    }
}

/// Scale
impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

/// Vector negative
impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Self::Output {
        self.scale(-1.)
    }
}

/// Vector in-place addition
impl AddAssign<Vec3> for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.0 += rhs.0;
        self.1 += rhs.1;
        self.2 += rhs.2;
    }
}

#[cfg(test)]
mod test {
    use super::Vec3;

    #[test]
    fn cross_follows_right_hand_rule() {
        let x = Vec3::of(1., 0., 0.);
        let y = Vec3::of(0., 1., 0.);
        assert_eq!(x.cross(&y), Vec3::of(0., 0., 1.));
        assert_eq!(y.cross(&x), Vec3::of(0., 0., -1.));
    }

    #[test]
    fn add_assign_keeps_axes() {
        let mut v = Vec3::of(1., 2., 3.);
        v += Vec3::of(10., 20., 30.);
        assert_eq!(v, Vec3::of(11., 22., 33.));
    }

    #[test]
    fn lerp_midpoint() {
        let a = Vec3::of(0., 0., 0.);
        let b = Vec3::of(2., -4., 6.);
        assert_eq!(a.lerp(&b, 0.5), Vec3::of(1., -2., 3.));
    }

    #[test]
    fn serde_uses_named_fields() {
        let v: Vec3 = serde_json::from_str(r#"{"x": 1.5, "y": -2.0, "z": 0.25}"#).unwrap();
        assert_eq!(v, Vec3::of(1.5, -2.0, 0.25));
        let text = serde_json::to_string(&Vec3::of(1., 2., 3.)).unwrap();
        assert_eq!(text, r#"{"x":1.0,"y":2.0,"z":3.0}"#);
    }
}
