use std::ops::{Index, Mul};

use super::Vec3;

/// 3x3 matrix (row-major)
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat33(pub [f64; 9]);

impl Mat33 {
    /// Create matrix with all zeroes
    pub const fn zeroes() -> Self {
        Self([0.; 9])
    }

    /// Create from array
    pub const fn of(v: [f64; 9]) -> Self {
        Self(v)
    }

    /// Create an identity matrix
    pub const fn identity() -> Self {
        Self([
            1., 0., 0.,
            0., 1., 0.,
            0., 0., 1.,
        ])
    }

    /// Rotation matrix for a unit quaternion, given as `[x, y, z, w]`
    pub fn from_quaternion(q: [f64; 4]) -> Self {
        let w = q[3];
        let x = q[0];
        let y = q[1];
        let z = q[2];

        let qxx = x*x;
        let qyy = y*y;
        let qzz = z*z;
        let qxz = x*z;
        let qxy = x*y;
        let qyz = y*z;
        let qwx = w*x;
        let qwy = w*y;
        let qwz = w*z;

        Self::of([
            1. - 2.*(qyy + qzz), 2.*(qxy - qwz),     2.*(qxz + qwy),
            2.*(qxy + qwz),     1. - 2.*(qxx + qzz), 2.*(qyz - qwx),
            2.*(qxz - qwy),     2.*(qyz + qwx),     1. - 2.*(qxx + qyy),
        ])
    }

    /// Determinant
    pub fn det(&self) -> f64 {
        0.
            + self.0[0] * self.0[4] * self.0[8]
            - self.0[0] * self.0[5] * self.0[7]
            + self.0[1] * self.0[5] * self.0[6]
            - self.0[1] * self.0[3] * self.0[8]
            + self.0[2] * self.0[3] * self.0[7]
            - self.0[2] * self.0[4] * self.0[6]
    }

    /// Transpose
    pub const fn transposed(&self) -> Self {
        Self([
            self.0[0], self.0[3], self.0[6],
            self.0[1], self.0[4], self.0[7],
            self.0[2], self.0[5], self.0[8],
        ])
    }

    /// Matrix multipliation
    pub fn matmul(&self, rhs: &Mat33) -> Self {
        let mut out = Self::zeroes();
        for row in 0..3 {
            for col in 0..3 {
                out.0[row * 3 + col] = (0..3)
                    .map(|k| self[(row, k)] * rhs[(k, col)])
                    .sum();
            }
        }
        out
    }
}

impl Index<(usize, usize)> for Mat33 {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.0[row * 3 + col]
    }
}

/// Matrix-vector product
impl Mul<&Vec3> for &Mat33 {
    type Output = Vec3;

    fn mul(self, rhs: &Vec3) -> Self::Output {
        Vec3(
            self.0[0] * rhs.0 + self.0[1] * rhs.1 + self.0[2] * rhs.2,
            self.0[3] * rhs.0 + self.0[4] * rhs.1 + self.0[5] * rhs.2,
            self.0[6] * rhs.0 + self.0[7] * rhs.1 + self.0[8] * rhs.2,
        )
    }
}
