// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reference shapes a facet can be compared against.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// The closed set of boundary shapes with a dedicated integration rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Tri3,
    Quad4,
}

impl ShapeKind {
    pub fn num_nodes(self) -> usize {
        match self {
            ShapeKind::Tri3 => 3,
            ShapeKind::Quad4 => 4,
        }
    }

    /// Returns `true` if the corner coordinates form a valid element of this
    /// shape within the given tolerance.
    pub fn is_valid(self, corners: &[Point3<f64>], tol: f64) -> bool {
        match self {
            ShapeKind::Tri3 => is_valid_tri3(corners, tol),
            ShapeKind::Quad4 => is_valid_quad4(corners, tol),
        }
    }
}

/// Three points that are not collinear.
pub fn is_valid_tri3(corners: &[Point3<f64>], tol: f64) -> bool {
    if corners.len() != 3 {
        return false;
    }
    let n = (corners[1] - corners[0]).cross(&(corners[2] - corners[0]));
    n.norm() > tol
}

/// Four planar points forming a convex quadrilateral with no degenerate
/// corner.
pub fn is_valid_quad4(corners: &[Point3<f64>], tol: f64) -> bool {
    if corners.len() != 4 {
        return false;
    }

    let mut reference: Option<nalgebra::Vector3<f64>> = None;
    for i in 0..4 {
        let prev = corners[(i + 3) % 4];
        let curr = corners[i];
        let next = corners[(i + 1) % 4];

        let corner = (curr - prev).cross(&(next - curr));
        if corner.norm() <= tol {
            return false;
        }
        match reference {
            None => reference = Some(corner),
            Some(r) => {
                if r.dot(&corner) <= 0.0 {
                    return false;
                }
            }
        }
    }

    // warp: distance of an edge from the plane spanned by the diagonals
    let diagonals = (corners[2] - corners[0]).cross(&(corners[3] - corners[1]));
    let Some(normal) = diagonals.try_normalize(tol) else {
        return false;
    };
    (corners[1] - corners[0]).dot(&normal).abs() <= tol
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn square_is_quad4_not_tri3() {
        assert!(ShapeKind::Quad4.is_valid(&square(), 1e-10));
        assert!(!ShapeKind::Tri3.is_valid(&square(), 1e-10));
    }

    #[test]
    fn bow_tie_is_not_quad4() {
        let mut pts = square();
        pts.swap(2, 3);
        assert!(!is_valid_quad4(&pts, 1e-10));
    }

    #[test]
    fn warped_quad_is_rejected() {
        let mut pts = square();
        pts[2].z = 0.3;
        assert!(!is_valid_quad4(&pts, 1e-6));
    }

    #[test]
    fn collinear_triangle_is_rejected() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(!is_valid_tri3(&pts, 1e-10));
        assert!(is_valid_tri3(&square()[..3], 1e-10));
    }

    #[test]
    fn node_counts() {
        assert_eq!(ShapeKind::Tri3.num_nodes(), 3);
        assert_eq!(ShapeKind::Quad4.num_nodes(), 4);
    }
}
