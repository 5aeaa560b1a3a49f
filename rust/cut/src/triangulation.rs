// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Facet decomposition.
//!
//! Two strategies are available:
//!
//! - [`CuttingSession::create_triangulation`] builds a fan of triangles around
//!   a new centroid point. It is only valid for convex facets.
//! - [`CuttingSession::split_facet`] ear clips the loop in its dominant plane
//!   and merges neighbouring triangles into convex quads. It needs no new
//!   points and copes with concave loops.

use nalgebra::Point3;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::keys::*;
use crate::planarity::newell_normal;
use crate::session::CuttingSession;

impl CuttingSession {
    /// Triangulates a facet as a fan around the centroid of `points`.
    ///
    /// The centroid becomes a new point on the facet's parent side, carrying
    /// the facet's position. An existing triangulation is kept.
    pub fn create_triangulation(&mut self, facet: FacetKey, points: &[PointKey]) -> Result<()> {
        let data = self.facet_data(facet)?;
        if data.is_triangulated() {
            return Ok(());
        }
        if points.len() < 3 {
            return Err(Error::TooFewPoints(points.len()));
        }
        let parent_side = data.parent_side;
        let position = data.position;

        let coords = self.coords_of(points)?;
        let sum = coords
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, x| acc + x.coords);
        let centroid = Point3::from(sum / coords.len() as f64);

        let mid = self.new_point(centroid, None, Some(parent_side))?;
        self.points[mid].position = position;
        self.link_point_facet(mid, facet);

        let n = points.len();
        let triangles: Vec<[PointKey; 3]> = (0..n)
            .map(|i| [mid, points[i], points[(i + 1) % n]])
            .collect();

        tracing::debug!(?facet, triangles = triangles.len(), "created centroid fan");
        self.facet_data_mut(facet)?.triangulation = triangles;
        Ok(())
    }

    /// Drops the triangulation of a facet together with its centroid point and
    /// forgets memoized planarity.
    ///
    /// Boundary cells of the facet that use the centroid are removed from their
    /// volume cells as well. Cells on the facet's own loop points are kept.
    pub fn invalidate_triangulation(&mut self, facet: FacetKey) -> Result<()> {
        let data = self.facet_data_mut(facet)?;
        let centroid = data.triangulation.first().map(|tri| tri[0]);
        data.triangulation.clear();
        data.planar_known = false;
        data.planar = false;
        data.planar_computed = false;
        data.is_planar = false;

        if let Some(mid) = centroid {
            self.remove_boundary_cells_using(facet, mid);
            self.unlink_point_facet(mid, facet);
            let unused = self.point_to_facets.get(&mid).map_or(true, |f| f.is_empty())
                && !self.boundary_cells.values().any(|bc| bc.points.contains(&mid));
            if unused {
                self.point_to_facets.remove(&mid);
                self.points.remove(mid);
            }
        }
        Ok(())
    }

    fn remove_boundary_cells_using(&mut self, facet: FacetKey, point: PointKey) {
        let stale: Vec<BoundaryCellKey> = self
            .boundary_cells
            .iter()
            .filter(|(_, bc)| bc.facet == facet && bc.points.contains(&point))
            .map(|(key, _)| key)
            .collect();
        if !stale.is_empty() {
            tracing::debug!(?facet, cells = stale.len(), "dropping boundary cells on centroid");
        }
        for key in stale {
            if let Some(bc) = self.boundary_cells.remove(key) {
                if let Some(cell) = self.volume_cells.get_mut(bc.volume_cell) {
                    cell.boundary_cells.retain(|k| *k != key);
                }
            }
        }
    }

    pub fn is_triangulated(&self, facet: FacetKey) -> Result<bool> {
        Ok(self.facet_data(facet)?.is_triangulated())
    }

    pub fn triangulation(&self, facet: FacetKey) -> Result<&[[PointKey; 3]]> {
        Ok(&self.facet_data(facet)?.triangulation)
    }

    /// Returns the distinct vertices of the triangulation in first-seen order.
    pub fn triangulation_points(&self, facet: FacetKey) -> Result<Vec<PointKey>> {
        let mut seen = FxHashSet::default();
        Ok(self
            .facet_data(facet)?
            .triangulation
            .iter()
            .flatten()
            .copied()
            .filter(|p| seen.insert(*p))
            .collect())
    }

    pub fn split_cells(&self, facet: FacetKey) -> Result<&[Vec<PointKey>]> {
        Ok(&self.facet_data(facet)?.split_cells)
    }

    /// Splits a facet loop into triangles and convex quads.
    ///
    /// The loop is projected onto the coordinate plane most aligned with its
    /// Newell normal and ear clipped. Triangles are oriented like the loop, and
    /// pairs sharing an edge are merged whenever the resulting quad is convex.
    /// The result replaces the facet's split cells.
    pub fn split_facet(&mut self, facet: FacetKey, points: &[PointKey]) -> Result<()> {
        self.facet_data(facet)?;
        if points.len() < 3 {
            return Err(Error::TooFewPoints(points.len()));
        }
        let coords = self.coords_of(points)?;
        let flat = project_to_dominant_plane(&coords);

        let cells: Vec<Vec<usize>> = if points.len() == 3 {
            vec![vec![0, 1, 2]]
        } else {
            let mut vertices = Vec::with_capacity(flat.len() * 2);
            for p in &flat {
                vertices.push(p[0]);
                vertices.push(p[1]);
            }
            let indices = earcutr::earcut(&vertices, &[], 2)
                .map_err(|e| Error::Triangulation(format!("{:?}", e)))?;
            if indices.is_empty() {
                return Err(Error::Triangulation(format!(
                    "no triangles for facet {facet:?}"
                )));
            }

            let orientation = signed_area(&flat).signum();
            let triangles: Vec<[usize; 3]> = indices
                .chunks_exact(3)
                .map(|t| {
                    let tri = [t[0], t[1], t[2]];
                    if signed_area(&[flat[tri[0]], flat[tri[1]], flat[tri[2]]]).signum()
                        == orientation
                    {
                        tri
                    } else {
                        [tri[0], tri[2], tri[1]]
                    }
                })
                .collect();
            merge_into_quads(&triangles, &flat, orientation)
        };

        let split: Vec<Vec<PointKey>> = cells
            .into_iter()
            .map(|cell| cell.into_iter().map(|i| points[i]).collect())
            .collect();

        tracing::debug!(?facet, cells = split.len(), "split facet");
        self.facet_data_mut(facet)?.split_cells = split;
        Ok(())
    }
}

/// Drops the coordinate along the dominant axis of the Newell normal.
fn project_to_dominant_plane(coords: &[Point3<f64>]) -> Vec<[f64; 2]> {
    let normal = newell_normal(coords);
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());

    coords
        .iter()
        .map(|p| {
            if az >= ax && az >= ay {
                [p.x, p.y]
            } else if ay >= ax {
                [p.z, p.x]
            } else {
                [p.y, p.z]
            }
        })
        .collect()
}

/// Shoelace area, positive for counter-clockwise loops.
fn signed_area(points: &[[f64; 2]]) -> f64 {
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a[0] * b[1] - b[0] * a[1]
        })
        .sum();
    twice * 0.5
}

/// Convex within the loop orientation, without collinear corners.
fn is_convex_quad(quad: &[usize; 4], flat: &[[f64; 2]], orientation: f64) -> bool {
    (0..4).all(|i| {
        let a = flat[quad[i]];
        let b = flat[quad[(i + 1) % 4]];
        let c = flat[quad[(i + 2) % 4]];
        let cross = (b[0] - a[0]) * (c[1] - b[1]) - (b[1] - a[1]) * (c[0] - b[0]);
        cross * orientation > 0.0
    })
}

/// Greedily pairs triangles across shared edges.
///
/// For a triangle `(a, b, c)` whose edge `a → b` is shared with a neighbour
/// `(b, a, d)`, the merged quad is `(a, d, b, c)`.
fn merge_into_quads(triangles: &[[usize; 3]], flat: &[[f64; 2]], orientation: f64) -> Vec<Vec<usize>> {
    let mut used = vec![false; triangles.len()];
    let mut cells = Vec::with_capacity(triangles.len());

    for i in 0..triangles.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let tri = triangles[i];

        let mut merged = None;
        'edges: for k in 0..3 {
            let (a, b, c) = (tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]);
            for (j, other) in triangles.iter().enumerate() {
                if used[j] {
                    continue;
                }
                let Some(d) = third_vertex_of_reversed_edge(other, a, b) else {
                    continue;
                };
                let quad = [a, d, b, c];
                if is_convex_quad(&quad, flat, orientation) {
                    used[j] = true;
                    merged = Some(quad);
                    break 'edges;
                }
            }
        }

        match merged {
            Some(quad) => cells.push(quad.to_vec()),
            None => cells.push(tri.to_vec()),
        }
    }
    cells
}

/// Returns the vertex opposite the directed edge `b → a` of `tri`.
fn third_vertex_of_reversed_edge(tri: &[usize; 3], a: usize, b: usize) -> Option<usize> {
    (0..3)
        .find(|&k| tri[k] == b && tri[(k + 1) % 3] == a)
        .map(|k| tri[(k + 2) % 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::cyclic_equals;
    use crate::position::Position;
    use crate::shape::is_valid_quad4;
    use approx::assert_relative_eq;

    fn cell_area(session: &CuttingSession, cell: &[PointKey]) -> f64 {
        newell_normal(&session.coords_of(cell).unwrap()).norm() * 0.5
    }

    fn facet_from(session: &mut CuttingSession, coords: &[[f64; 3]]) -> (FacetKey, Vec<PointKey>) {
        let side = session.add_side(1);
        let points: Vec<PointKey> = coords
            .iter()
            .map(|c| session.add_point(c[0], c[1], c[2]))
            .collect();
        let facet = session.add_facet(points.clone(), side, false).unwrap();
        (facet, points)
    }

    #[test]
    fn fan_uses_centroid_first() {
        let mut session = CuttingSession::new();
        let (facet, points) = facet_from(
            &mut session,
            &[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 2.0, 0.0], [0.0, 2.0, 0.0]],
        );
        session.facets[facet].position = Position::Outside;

        session.create_triangulation(facet, &points).unwrap();

        let tris = session.triangulation(facet).unwrap().to_vec();
        assert_eq!(tris.len(), 4);
        let mid = tris[0][0];
        assert!(tris.iter().all(|t| t[0] == mid));
        assert_eq!(tris[3], [mid, points[3], points[0]]);

        let centroid = session.point(mid).unwrap();
        assert_relative_eq!(centroid.x, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(centroid.position, Position::Outside);
        assert!(centroid.cut_sides.contains(&session.facets[facet].parent_side));
        assert!(session.point_facets(mid).contains(&facet));

        let vertices = session.triangulation_points(facet).unwrap();
        assert_eq!(vertices.len(), 5);
        assert_eq!(session.num_points(facet).unwrap(), 5);
    }

    #[test]
    fn fan_is_idempotent() {
        let mut session = CuttingSession::new();
        let (facet, points) = facet_from(
            &mut session,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        );

        session.create_triangulation(facet, &points).unwrap();
        let first = session.triangulation(facet).unwrap().to_vec();
        session.create_triangulation(facet, &points).unwrap();

        assert_eq!(session.triangulation(facet).unwrap(), &first[..]);
        assert_eq!(session.point_count(), 5);
    }

    #[test]
    fn fan_area_matches_polygon() {
        let mut session = CuttingSession::new();
        let (facet, points) = facet_from(
            &mut session,
            &[
                [0.0, 0.0, 0.0],
                [3.0, 0.0, 0.0],
                [4.0, 2.0, 0.0],
                [2.0, 3.0, 0.0],
                [0.0, 2.0, 0.0],
            ],
        );
        let expected = cell_area(&session, &points);

        session.create_triangulation(facet, &points).unwrap();
        let total: f64 = session
            .triangulation(facet)
            .unwrap()
            .iter()
            .map(|t| cell_area(&session, t))
            .sum();
        assert_relative_eq!(total, expected, epsilon = 1e-12);
    }

    #[test]
    fn invalidation_removes_centroid() {
        let mut session = CuttingSession::new();
        let (facet, points) = facet_from(
            &mut session,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.2], [0.0, 1.0, 0.0]],
        );
        assert!(!session.is_planar(facet, false).unwrap());
        let mid = session.triangulation(facet).unwrap()[0][0];

        session.invalidate_triangulation(facet).unwrap();

        assert!(!session.is_triangulated(facet).unwrap());
        assert!(session.point(mid).is_none());
        assert_eq!(session.point_count(), points.len());

        // planarity is evaluated again and triangulates anew
        assert!(!session.is_planar(facet, false).unwrap());
        assert!(session.is_triangulated(facet).unwrap());
    }

    #[test]
    fn invalidation_drops_boundary_cells_on_centroid() {
        let mut session = CuttingSession::new();
        let side = session.add_side(2);
        let points = vec![
            session.add_point(0.0, 0.0, 0.0),
            session.add_point(1.0, 0.0, 0.0),
            session.add_point(1.0, 1.0, 0.2),
            session.add_point(0.0, 1.0, 0.0),
        ];
        let facet = session.add_facet(points.clone(), side, true).unwrap();
        let a = session.add_volume_cell(&[facet]).unwrap();
        let b = session.add_volume_cell(&[facet]).unwrap();
        assert!(!session.is_planar(facet, false).unwrap());
        let tris = session.triangulation(facet).unwrap().to_vec();
        let mid = tris[0][0];

        let mut out = Vec::new();
        for cell in [a, b] {
            for tri in &tris {
                session.new_tri3_cell(cell, facet, tri, &mut out).unwrap();
            }
            session.new_quad4_cell(cell, facet, &points, &mut out).unwrap();
        }
        assert_eq!(session.boundary_cell_count(), 10);

        session.invalidate_triangulation(facet).unwrap();

        assert!(session.point(mid).is_none());
        assert_eq!(session.boundary_cell_count(), 2);
        for cell in [a, b] {
            let left = session.volume_cell_boundary_cells(cell).unwrap();
            assert_eq!(left.len(), 1);
            assert_eq!(session.boundary_cell(left[0]).unwrap().points, points);
        }
        assert_eq!(session.test_facet_area(facet, 1e-10).unwrap(), None);
        assert!(session.to_json().is_ok());
    }

    #[test]
    fn split_square_is_one_quad() {
        let mut session = CuttingSession::new();
        let (facet, points) = facet_from(
            &mut session,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        );

        session.split_facet(facet, &points).unwrap();

        let cells = session.split_cells(facet).unwrap();
        assert_eq!(cells.len(), 1);
        assert!(cyclic_equals(&cells[0], &points));
    }

    #[test]
    fn split_concave_loop_covers_area() {
        let mut session = CuttingSession::new();
        let (facet, points) = facet_from(
            &mut session,
            &[
                [0.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [2.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
                [1.0, 2.0, 0.0],
                [0.0, 2.0, 0.0],
            ],
        );

        session.split_facet(facet, &points).unwrap();

        let cells = session.split_cells(facet).unwrap().to_vec();
        assert!(cells.len() >= 2 && cells.len() <= 4);
        let total: f64 = cells.iter().map(|c| cell_area(&session, c)).sum();
        assert_relative_eq!(total, 3.0, epsilon = 1e-12);

        for cell in &cells {
            assert!(cell.len() == 3 || cell.len() == 4);
            if cell.len() == 4 {
                let coords = session.coords_of(cell).unwrap();
                assert!(is_valid_quad4(&coords, 1e-10));
            }
        }
        // no synthesized points
        assert_eq!(session.point_count(), points.len());
    }

    #[test]
    fn split_vertical_loop_uses_other_plane() {
        let mut session = CuttingSession::new();
        let (facet, points) = facet_from(
            &mut session,
            &[
                [0.0, 0.0, 0.0],
                [0.0, 2.0, 0.0],
                [0.0, 2.0, 1.0],
                [0.0, 1.0, 2.0],
                [0.0, 0.0, 1.0],
            ],
        );

        session.split_facet(facet, &points).unwrap();

        let total: f64 = session
            .split_cells(facet)
            .unwrap()
            .iter()
            .map(|c| cell_area(&session, c))
            .sum();
        assert_relative_eq!(total, cell_area(&session, &points), epsilon = 1e-12);
    }

    #[test]
    fn merge_pairs_reversed_edges() {
        let flat = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let cells = merge_into_quads(&[[0, 1, 2], [2, 3, 0]], &flat, 1.0);
        assert_eq!(cells, vec![vec![2, 3, 0, 1]]);
        assert_eq!(third_vertex_of_reversed_edge(&[2, 3, 0], 2, 0), Some(3));
        assert_eq!(third_vertex_of_reversed_edge(&[2, 3, 0], 0, 2), None);
    }
}
