// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planarity tests and local frames for facet point loops.
//!
//! A loop is planar when every point past the frame pivot has an out-of-plane
//! coordinate within `planar_tol` in the frame spanned by the first edge and
//! the first non-collinear point. Non-planar facets are triangulated as a side
//! effect of the test.

use nalgebra::{Matrix3, Point3, Vector3};

use crate::error::{Error, Result};
use crate::keys::*;
use crate::session::CuttingSession;

/// Local frame of a point loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    /// Index of the first point that is not collinear with the first edge.
    pub pivot: usize,
    /// First point of the loop.
    pub origin: Point3<f64>,
    /// Unit direction of the first edge.
    pub b1: Vector3<f64>,
    /// Unit direction from the origin to the pivot point.
    pub b2: Vector3<f64>,
    /// Unit normal `b1 × b2`.
    pub b3: Vector3<f64>,
}

impl LocalFrame {
    /// Solves `[b1 b2 b3] · x = p - origin` for the frame coordinates of `p`.
    pub fn local_coordinates(&self, p: &Point3<f64>, linsolve_tol: f64) -> Result<Vector3<f64>> {
        let a = Matrix3::from_columns(&[self.b1, self.b2, self.b3]);
        let lu = a.lu();
        let det = lu.determinant();
        if det.abs() < linsolve_tol {
            return Err(Error::SingularSystem(det));
        }
        lu.solve(&(*p - self.origin))
            .ok_or(Error::SingularSystem(det))
    }
}

impl CuttingSession {
    /// Builds the local frame of a point loop.
    ///
    /// Returns `None` when the loop has fewer than three points or all points
    /// lie on the line of the first edge; such loops are trivially planar.
    pub fn normal_frame(&self, points: &[PointKey]) -> Result<Option<LocalFrame>> {
        if points.len() < 3 {
            return Ok(None);
        }
        let coords = self.coords_of(points)?;
        let origin = coords[0];

        let edge = coords[1] - origin;
        if edge.norm() < f64::EPSILON {
            return Err(Error::DegeneratePoints(
                self.point_data(points[0])?.id,
                self.point_data(points[1])?.id,
            ));
        }
        let b1 = edge.normalize();

        for (i, x) in coords.iter().enumerate().skip(2) {
            let Some(b2) = (*x - origin).try_normalize(0.0) else {
                continue;
            };
            let b3 = b1.cross(&b2);
            if b3.norm() > self.options.planar_tol {
                return Ok(Some(LocalFrame {
                    pivot: i,
                    origin,
                    b1,
                    b2,
                    b3: b3.normalize(),
                }));
            }
        }
        Ok(None)
    }

    /// Checks the planarity of a point loop on behalf of `facet`.
    ///
    /// The exact result is memoized on the facet. A non-planar loop triangulates
    /// the facet.
    pub fn is_planar_loop(&mut self, facet: FacetKey, points: &[PointKey]) -> Result<bool> {
        let data = self.facet_data(facet)?;
        if data.planar_computed {
            return Ok(data.is_planar);
        }

        let planar = self.loop_is_planar(points)?;
        if !planar {
            tracing::debug!(?facet, points = points.len(), "facet is not planar");
            self.create_triangulation(facet, points)?;
        }

        let data = self.facet_data_mut(facet)?;
        data.planar_computed = true;
        data.is_planar = planar;
        Ok(planar)
    }

    /// Tests a loop against the frame tolerance without touching any facet.
    pub(crate) fn loop_is_planar(&self, points: &[PointKey]) -> Result<bool> {
        let Some(frame) = self.normal_frame(points)? else {
            return Ok(true);
        };
        let tol = self.options.planar_tol;
        let linsolve_tol = self.options.linsolve_tol;

        for &p in &points[frame.pivot + 1..] {
            let x = frame.local_coordinates(&self.point_coords(p)?, linsolve_tol)?;
            if x[2].abs() > tol {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Returns whether the facet is planar.
    ///
    /// With `dotriangulate` set, any untriangulated facet with more than three
    /// corners is triangulated and reported as non-planar, so that callers
    /// integrate over triangles only.
    pub fn is_planar(&mut self, facet: FacetKey, dotriangulate: bool) -> Result<bool> {
        let data = self.facet_data(facet)?;
        if dotriangulate && !data.is_triangulated() && data.corner_points.len() > 3 {
            let points = data.points.clone();
            self.create_triangulation(facet, &points)?;
            let data = self.facet_data_mut(facet)?;
            data.planar_known = true;
            data.planar = false;
        }

        let data = self.facet_data(facet)?;
        if !data.planar_known {
            let points = data.points.clone();
            let planar = self.is_planar_loop(facet, &points)?;
            let data = self.facet_data_mut(facet)?;
            data.planar = planar;
            data.planar_known = true;
        }
        Ok(self.facet_data(facet)?.planar)
    }
}

/// Newell normal of a closed loop. Its length is twice the enclosed area for
/// planar loops.
pub(crate) fn newell_normal(coords: &[Point3<f64>]) -> Vector3<f64> {
    let n = coords.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = &coords[i];
        let b = &coords[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn add_loop(session: &mut CuttingSession, coords: &[[f64; 3]]) -> Vec<PointKey> {
        coords
            .iter()
            .map(|c| session.add_point(c[0], c[1], c[2]))
            .collect()
    }

    #[test]
    fn frame_of_square() {
        let mut session = CuttingSession::new();
        let p = add_loop(
            &mut session,
            &[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 2.0, 0.0], [0.0, 2.0, 0.0]],
        );

        let frame = session.normal_frame(&p).unwrap().unwrap();
        assert_eq!(frame.pivot, 2);
        assert_relative_eq!(frame.b1, Vector3::x());
        assert_relative_eq!(frame.b3, Vector3::z(), epsilon = 1e-12);

        let local = frame
            .local_coordinates(&Point3::new(0.0, 2.0, 0.0), 1e-30)
            .unwrap();
        assert_relative_eq!(local[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_have_no_frame() {
        let mut session = CuttingSession::new();
        let p = add_loop(
            &mut session,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0]],
        );

        assert!(session.normal_frame(&p).unwrap().is_none());
        assert!(session.normal_frame(&p[..2]).unwrap().is_none());
        assert!(session.loop_is_planar(&p).unwrap());
    }

    #[test]
    fn coincident_first_edge_is_degenerate() {
        let mut session = CuttingSession::new();
        let p = add_loop(
            &mut session,
            &[[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [2.0, 0.0, 0.0]],
        );

        assert!(matches!(
            session.normal_frame(&p),
            Err(Error::DegeneratePoints(0, 1))
        ));
    }

    #[test]
    fn pivot_skips_collinear_prefix() {
        let mut session = CuttingSession::new();
        let p = add_loop(
            &mut session,
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
        );

        let frame = session.normal_frame(&p).unwrap().unwrap();
        assert_eq!(frame.pivot, 3);
    }

    #[test]
    fn tilted_plane_is_planar() {
        let mut session = CuttingSession::new();
        let side = session.add_side(0);
        let p = add_loop(
            &mut session,
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
                [0.5, 1.5, 0.5],
                [0.0, 1.0, 0.0],
            ],
        );
        let facet = session.add_facet(p, side, false).unwrap();

        assert!(session.is_planar(facet, false).unwrap());
        assert!(!session.facet(facet).unwrap().is_triangulated());
    }

    #[test]
    fn warped_quad_triangulates_once() {
        let mut session = CuttingSession::new();
        let side = session.add_side(0);
        let p = add_loop(
            &mut session,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.1], [0.0, 1.0, 0.0]],
        );
        let facet = session.add_facet(p, side, false).unwrap();

        assert!(!session.is_planar(facet, false).unwrap());
        let points_after_first = session.point_count();
        assert!(!session.is_planar(facet, false).unwrap());

        assert_eq!(session.point_count(), points_after_first);
        assert_eq!(session.facet(facet).unwrap().triangulation.len(), 4);
    }

    #[test]
    fn dotriangulate_forces_fan_on_planar_pentagon() {
        let mut session = CuttingSession::new();
        let side = session.add_side(0);
        let p = add_loop(
            &mut session,
            &[
                [0.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [3.0, 1.0, 0.0],
                [1.0, 2.0, 0.0],
                [-1.0, 1.0, 0.0],
            ],
        );
        let facet = session.add_facet(p, side, false).unwrap();

        assert!(!session.is_planar(facet, true).unwrap());
        assert_eq!(session.facet(facet).unwrap().triangulation.len(), 5);
    }

    #[test]
    fn dotriangulate_keeps_triangles() {
        let mut session = CuttingSession::new();
        let side = session.add_side(0);
        let p = add_loop(
            &mut session,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        );
        let facet = session.add_facet(p, side, false).unwrap();

        assert!(session.is_planar(facet, true).unwrap());
        assert!(!session.facet(facet).unwrap().is_triangulated());
    }

    #[test]
    fn newell_normal_of_unit_square() {
        let coords = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        assert_relative_eq!(newell_normal(&coords), Vector3::new(0.0, 0.0, 2.0));
    }
}
