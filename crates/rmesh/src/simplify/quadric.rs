//! The symmetric 4x4 plane-quadric used to accumulate per-vertex error.
//!
//! Stored as the ten scalars above (and on) the diagonal rather than a
//! general `Matrix4`, halving the footprint of the largest per-vertex
//! allocation in the engine (Garland & Heckbert, "Surface Simplification
//! Using Quadric Error Metrics").

use std::ops::{Add, AddAssign};

use nalgebra::Point3;

/// `Q = p * p^T` for a plane `p = (a, b, c, d)`, stored as the ten
/// independent entries of the resulting symmetric 4x4 matrix:
///
/// ```text
/// | m0 m1 m2 m3 |
/// | m1 m4 m5 m6 |
/// | m2 m5 m7 m8 |
/// | m3 m6 m8 m9 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetricMatrix {
    m: [f64; 10],
}

impl SymmetricMatrix {
    pub const ZERO: SymmetricMatrix = SymmetricMatrix { m: [0.0; 10] };

    /// Build the quadric for a single plane `ax + by + cz + d = 0`.
    pub fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        SymmetricMatrix {
            m: [
                a * a,
                a * b,
                a * c,
                a * d,
                b * b,
                b * c,
                b * d,
                c * c,
                c * d,
                d * d,
            ],
        }
    }

    #[inline]
    fn get(&self, index: usize) -> f64 {
        self.m[index]
    }

    /// Determinant of the 3x3 submatrix selected by the nine given entry
    /// indices, read in row-major order. Used both for the upper-left 3x3
    /// block (to test invertibility) and for the three cofactor
    /// determinants used to solve for the optimal collapse point.
    #[allow(clippy::too_many_arguments)]
    fn det3(
        &self,
        a11: usize,
        a12: usize,
        a13: usize,
        a21: usize,
        a22: usize,
        a23: usize,
        a31: usize,
        a32: usize,
        a33: usize,
    ) -> f64 {
        self.get(a11) * self.get(a22) * self.get(a33)
            + self.get(a13) * self.get(a21) * self.get(a32)
            + self.get(a12) * self.get(a23) * self.get(a31)
            - self.get(a13) * self.get(a22) * self.get(a31)
            - self.get(a11) * self.get(a23) * self.get(a32)
            - self.get(a12) * self.get(a21) * self.get(a33)
    }

    /// Determinant of the upper-left 3x3 block (the linear part of the
    /// quadric). A value near zero means the quadric doesn't pin down a
    /// unique minimizer and the caller should fall back to evaluating
    /// endpoints/midpoint instead of solving for it.
    pub fn det_upper_left(&self) -> f64 {
        self.det3(0, 1, 2, 1, 4, 5, 2, 5, 7)
    }

    /// The optimal collapse point `p* = Q^-1 * (0, 0, 0, 1)` expressed via
    /// the three cofactor determinants, without forming the inverse
    /// explicitly. Only meaningful when [`det_upper_left`] is non-zero.
    pub fn optimal_point(&self, det: f64) -> Point3<f64> {
        Point3::new(
            -self.det3(1, 2, 3, 4, 5, 6, 5, 7, 8) / det,
            self.det3(0, 2, 3, 1, 5, 6, 2, 7, 8) / det,
            -self.det3(0, 1, 3, 1, 4, 6, 2, 5, 8) / det,
        )
    }

    /// Evaluate `v^T Q v` for a homogeneous point `(x, y, z, 1)`, i.e. the
    /// summed squared distance from `p` to every plane accumulated into
    /// this quadric.
    pub fn error_at(&self, p: Point3<f64>) -> f64 {
        let (x, y, z) = (p.x, p.y, p.z);
        self.get(0) * x * x
            + 2.0 * self.get(1) * x * y
            + 2.0 * self.get(2) * x * z
            + 2.0 * self.get(3) * x
            + self.get(4) * y * y
            + 2.0 * self.get(5) * y * z
            + 2.0 * self.get(6) * y
            + self.get(7) * z * z
            + 2.0 * self.get(8) * z
            + self.get(9)
    }
}

impl Default for SymmetricMatrix {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for SymmetricMatrix {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let mut m = self.m;
        for i in 0..10 {
            m[i] += rhs.m[i];
        }
        SymmetricMatrix { m }
    }
}

impl AddAssign for SymmetricMatrix {
    fn add_assign(&mut self, rhs: Self) {
        for i in 0..10 {
            self.m[i] += rhs.m[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn plane_quadric_is_zero_on_its_own_plane() {
        // plane z = 0, i.e. (a, b, c, d) = (0, 0, 1, 0)
        let q = SymmetricMatrix::from_plane(0.0, 0.0, 1.0, 0.0);
        assert_relative_eq!(q.error_at(Point3::new(3.0, -2.0, 0.0)), 0.0, epsilon = 1e-12);
        // off the plane the error is the squared distance
        assert_relative_eq!(q.error_at(Point3::new(0.0, 0.0, 2.0)), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn addition_sums_both_planes() {
        let q1 = SymmetricMatrix::from_plane(0.0, 0.0, 1.0, 0.0); // z = 0
        let q2 = SymmetricMatrix::from_plane(1.0, 0.0, 0.0, 0.0); // x = 0
        let sum = q1 + q2;
        let p = Point3::new(1.0, 0.0, 1.0);
        assert_relative_eq!(sum.error_at(p), q1.error_at(p) + q2.error_at(p), epsilon = 1e-12);
    }

    #[test]
    fn add_assign_matches_add() {
        let q1 = SymmetricMatrix::from_plane(1.0, 2.0, 3.0, 4.0);
        let q2 = SymmetricMatrix::from_plane(-1.0, 0.5, 2.0, 1.0);
        let mut acc = q1;
        acc += q2;
        assert_eq!(acc, q1 + q2);
    }

    #[test]
    fn three_orthogonal_planes_invert_to_their_intersection() {
        let qx = SymmetricMatrix::from_plane(1.0, 0.0, 0.0, -1.0); // x = 1
        let qy = SymmetricMatrix::from_plane(0.0, 1.0, 0.0, -2.0); // y = 2
        let qz = SymmetricMatrix::from_plane(0.0, 0.0, 1.0, -3.0); // z = 3
        let q = qx + qy + qz;
        let det = q.det_upper_left();
        assert!(det.abs() > 1e-9);
        let p = q.optimal_point(det);
        assert_relative_eq!(p, Point3::new(1.0, 2.0, 3.0), epsilon = 1e-9);
    }
}
