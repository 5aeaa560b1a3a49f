// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Facet construction, classification and topological queries.
//!
//! A facet is created once per polygon loop found while cutting an element.
//! Its point loop is immutable afterwards; what changes is its position, its
//! lazily built triangulation and the volume cells registered on it.

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::keys::*;
use crate::mapping::ElementMapping;
use crate::position::Position;
use crate::propagation::Propagation;
use crate::session::{CuttingSession, FacetData};
use crate::shape::ShapeKind;

/// Edge map used to stitch facets together: ordered point pair (by point id)
/// → facets using that edge.
pub type LineMap = FxHashMap<(PointKey, PointKey), FxHashSet<FacetKey>>;

impl CuttingSession {
    /// Creates a facet from a point loop lying on `side`.
    ///
    /// Facets created as part of a cut surface force all their points onto the
    /// cut surface. Other facets start undecided, unless every point is
    /// already on a cut surface and the side is a physical one: on repeated
    /// cuts those facets belong to an earlier cut surface.
    ///
    /// The facet is registered on every point of its loop.
    pub fn add_facet(
        &mut self,
        points: Vec<PointKey>,
        side: SideKey,
        cut_surface: bool,
    ) -> Result<FacetKey> {
        self.check_loop(&points)?;
        let side_id = self.side_data(side)?.id;

        let position = if cut_surface {
            for &p in &points {
                self.points[p].position = Position::OnCutSurface;
            }
            Position::OnCutSurface
        } else if side_id > -1
            && points
                .iter()
                .all(|&p| self.points[p].position == Position::OnCutSurface)
        {
            Position::OnCutSurface
        } else {
            Position::Undecided
        };

        let key = self.insert_facet(points.clone(), side, position);
        self.find_corner_points(key)?;
        for &p in &points {
            self.link_point_facet(p, key);
        }

        tracing::trace!(facet = ?key, points = points.len(), %position, "created facet");
        Ok(key)
    }

    /// Adds a hole to a facet. The hole's points are registered on the facet.
    pub fn add_hole(&mut self, facet: FacetKey, hole: FacetKey) -> Result<()> {
        let hole_points = self.facet_data(hole)?.points.clone();
        let data = self.facet_data_mut(facet)?;
        if !data.holes.contains(&hole) {
            data.holes.push(hole);
        }
        for p in hole_points {
            self.link_point_facet(p, facet);
        }
        Ok(())
    }

    /// Checks a facet loop: at least three live points, no two consecutive
    /// points equal (the closing pair included).
    pub(crate) fn check_loop(&self, points: &[PointKey]) -> Result<()> {
        if points.len() < 3 {
            return Err(Error::TooFewPoints(points.len()));
        }
        for &p in points {
            self.point_data(p)?;
        }
        for (i, &p) in points.iter().enumerate() {
            if p == points[(i + 1) % points.len()] {
                return Err(Error::IdenticalLinePoints(self.point_data(p)?.id));
            }
        }
        Ok(())
    }

    // --- Corner points ---

    pub(crate) fn find_corner_points(&mut self, key: FacetKey) -> Result<()> {
        if !self.facet_data(key)?.corner_points.is_empty() {
            return Ok(());
        }
        let points = self.facet_data(key)?.points.clone();
        let corners = if self.options.detect_corners {
            self.detect_corner_points(&points)?
        } else {
            points
        };
        self.facet_data_mut(key)?.corner_points = corners;
        Ok(())
    }

    /// Keeps only points where the loop changes direction.
    fn detect_corner_points(&self, points: &[PointKey]) -> Result<Vec<PointKey>> {
        let coords = self.coords_of(points)?;
        let n = coords.len();
        let tol = self.options.planar_tol;

        let corners: Vec<PointKey> = (0..n)
            .filter(|&i| {
                let incoming = coords[i] - coords[(i + n - 1) % n];
                let outgoing = coords[(i + 1) % n] - coords[i];
                match (incoming.try_normalize(0.0), outgoing.try_normalize(0.0)) {
                    (Some(a), Some(b)) => a.cross(&b).norm() > tol,
                    _ => false,
                }
            })
            .map(|i| points[i])
            .collect();

        if corners.len() < 3 {
            tracing::warn!(
                corners = corners.len(),
                points = n,
                "corner detection degenerate, keeping all facet points"
            );
            return Ok(points.to_vec());
        }
        Ok(corners)
    }

    /// Discards memoized corner points and computes them again.
    pub fn recompute_corner_points(&mut self, key: FacetKey) -> Result<()> {
        self.facet_data_mut(key)?.corner_points.clear();
        self.find_corner_points(key)
    }

    pub fn corner_points(&self, key: FacetKey) -> Result<&[PointKey]> {
        Ok(&self.facet_data(key)?.corner_points)
    }

    /// Returns the local coordinates of the corner points within `element`.
    ///
    /// With `shadow` set, shadow elements map through their quadratic parent.
    pub fn corner_points_local<E: ElementMapping>(
        &self,
        key: FacetKey,
        element: &E,
        shadow: bool,
    ) -> Result<Vec<Point3<f64>>> {
        let corners = self.corner_coordinates(key)?;
        corners
            .iter()
            .map(|x| {
                if shadow && element.is_shadow() {
                    element.local_coordinates_quad(x)
                } else {
                    element.local_coordinates(x)
                }
            })
            .collect()
    }

    pub fn coordinates(&self, key: FacetKey) -> Result<Vec<Point3<f64>>> {
        self.coords_of(&self.facet_data(key)?.points)
    }

    pub fn corner_coordinates(&self, key: FacetKey) -> Result<Vec<Point3<f64>>> {
        self.coords_of(&self.facet_data(key)?.corner_points)
    }

    // --- Position ---

    pub fn facet_position(&self, key: FacetKey) -> Result<Position> {
        Ok(self.facet_data(key)?.position)
    }

    /// Classifies an undecided facet.
    ///
    /// Inside and outside spread to the undecided points of the facet and to
    /// its volume cells. A decided facet keeps its position; a request to flip
    /// it between inside and outside is logged, and rejected with
    /// [`Error::InconsistentPosition`] when `strict_positions` is set.
    pub fn set_facet_position(&mut self, key: FacetKey, pos: Position) -> Result<()> {
        self.propagate(Propagation::Facet(key, pos))
    }

    /// Returns the id of the parent side (negative for virtual sides).
    pub fn side_id(&self, key: FacetKey) -> Result<i32> {
        let side = self.facet_data(key)?.parent_side;
        Ok(self.side_data(side)?.id)
    }

    /// Combines position and side id into one id for bookkeeping.
    ///
    /// Physical sides report their own id. Inside and outside facets on
    /// virtual sides report the position's sentinel id.
    pub fn position_side_id(&self, key: FacetKey) -> Result<i32> {
        let sid = self.side_id(key)?;
        match self.facet_data(key)?.position {
            Position::Undecided => Err(Error::InconsistentPosition(format!(
                "undecided facet position at facet {key:?}"
            ))),
            pos @ (Position::Inside | Position::Outside) => {
                Ok(if sid > -1 { sid } else { pos.sentinel_id() })
            }
            Position::OnCutSurface => {
                if sid > -1 {
                    Ok(sid)
                } else {
                    Err(Error::InconsistentPosition(
                        "cannot have facet on cut side without cut side".to_string(),
                    ))
                }
            }
        }
    }

    // --- Volume cell membership ---

    /// Attaches a volume cell to a facet.
    pub fn register_volume_cell(&mut self, facet: FacetKey, cell: VolumeCellKey) -> Result<()> {
        self.cell_data(cell)?;
        let data = self.facet_data_mut(facet)?;
        if data.cells.contains(&cell) {
            return Ok(());
        }
        if data.cells.len() >= 2 {
            return Err(Error::TooManyVolumeCells(facet));
        }
        data.cells.push(cell);
        tracing::trace!(?facet, ?cell, "registered volume cell");
        Ok(())
    }

    /// Detaches a volume cell from a facet. Detaching an absent cell is a no-op.
    pub fn disconnect_volume(&mut self, facet: FacetKey, cell: VolumeCellKey) -> Result<()> {
        self.facet_data_mut(facet)?.cells.retain(|c| *c != cell);
        Ok(())
    }

    pub fn facet_cells(&self, key: FacetKey) -> Result<&[VolumeCellKey]> {
        Ok(&self.facet_data(key)?.cells)
    }

    /// Returns the volume cell on the other side of the facet.
    pub fn neighbor(&self, facet: FacetKey, cell: VolumeCellKey) -> Result<Option<VolumeCellKey>> {
        let data = self.facet_data(facet)?;
        if !data.cells.contains(&cell) {
            return Err(Error::NotNeighbor(facet, cell));
        }
        Ok(data.cells.iter().copied().find(|&c| c != cell))
    }

    // --- Point sets ---

    pub fn facet_points(&self, key: FacetKey) -> Result<&[PointKey]> {
        Ok(&self.facet_data(key)?.points)
    }

    pub fn holes(&self, key: FacetKey) -> Result<&[FacetKey]> {
        Ok(&self.facet_data(key)?.holes)
    }

    /// Collects every point needed to integrate over the facet.
    ///
    /// Planar facets return their loop followed by the points of all holes.
    /// Non-planar facets return the vertices of their triangulation, which
    /// already covers the holes. Each point appears once, in first-seen order.
    pub fn get_all_points(&mut self, key: FacetKey, dotriangulate: bool) -> Result<Vec<PointKey>> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        self.collect_all_points(key, dotriangulate, &mut seen, &mut out)?;
        Ok(out)
    }

    fn collect_all_points(
        &mut self,
        key: FacetKey,
        dotriangulate: bool,
        seen: &mut FxHashSet<PointKey>,
        out: &mut Vec<PointKey>,
    ) -> Result<()> {
        if self.is_planar(key, dotriangulate)? {
            let data = self.facet_data(key)?;
            for &p in &data.points {
                if seen.insert(p) {
                    out.push(p);
                }
            }
            for hole in data.holes.clone() {
                self.collect_all_points(hole, false, seen, out)?;
            }
        } else {
            for tri in &self.facet_data(key)?.triangulation {
                for &p in tri {
                    if seen.insert(p) {
                        out.push(p);
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of points of the facet including holes; a triangulated facet
    /// counts its centroid instead.
    pub fn num_points(&self, key: FacetKey) -> Result<usize> {
        let data = self.facet_data(key)?;
        let mut count = data.points.len();
        if data.is_triangulated() {
            return Ok(count + 1);
        }
        for &hole in &data.holes {
            count += self.num_points(hole)?;
        }
        Ok(count)
    }

    // --- Membership and adjacency ---

    /// Returns `true` if the point belongs to the facet.
    pub fn contains(&self, key: FacetKey, point: PointKey) -> Result<bool> {
        let data = self.facet_data(key)?;
        self.facet_contains(data, point)
    }

    fn facet_contains(&self, data: &FacetData, point: PointKey) -> Result<bool> {
        if data.is_triangulated() {
            return Ok(data.triangulation.iter().any(|tri| tri.contains(&point)));
        }
        if data.points.contains(&point) {
            return Ok(true);
        }
        for &hole in &data.holes {
            if self.facet_contains(self.facet_data(hole)?, point)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns `true` if every point belongs to the facet.
    pub fn contains_all(&self, key: FacetKey, points: &[PointKey]) -> Result<bool> {
        for &p in points {
            if !self.contains(key, p)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Returns `true` if at least one point belongs to the facet.
    pub fn contains_some(&self, key: FacetKey, points: &[PointKey]) -> Result<bool> {
        for &p in points {
            if self.contains(key, p)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns `true` if any point of `key` belongs to `other`.
    pub fn touches(&self, key: FacetKey, other: FacetKey) -> Result<bool> {
        let points = &self.facet_data(key)?.points;
        self.contains_some(other, points)
    }

    /// Returns `true` if `p1` and `p2` are neighbours along the loop, along a
    /// triangle of the triangulation or along a hole.
    pub fn is_line(&self, key: FacetKey, p1: PointKey, p2: PointKey) -> Result<bool> {
        let data = self.facet_data(key)?;
        if data.is_triangulated() {
            return Ok(data
                .triangulation
                .iter()
                .any(|tri| loop_has_line(tri, p1, p2)));
        }
        if loop_has_line(&data.points, p1, p2) {
            return Ok(true);
        }
        for &hole in &data.holes {
            if self.is_line(hole, p1, p2)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Adds the boundary edges of the facet (and of its holes, attributed to
    /// the hole) to `lines`.
    pub fn get_lines(&self, key: FacetKey, lines: &mut LineMap) -> Result<()> {
        let data = self.facet_data(key)?;
        let n = data.points.len();
        for i in 0..n {
            let p1 = data.points[i];
            let p2 = data.points[(i + 1) % n];
            let id1 = self.point_data(p1)?.id;
            let id2 = self.point_data(p2)?.id;

            let line = match id1.cmp(&id2) {
                std::cmp::Ordering::Less => (p1, p2),
                std::cmp::Ordering::Greater => (p2, p1),
                std::cmp::Ordering::Equal => return Err(Error::IdenticalLinePoints(id1)),
            };
            lines.entry(line).or_default().insert(key);
        }
        for &hole in &data.holes {
            self.get_lines(hole, lines)?;
        }
        Ok(())
    }

    /// Returns `true` if `side` is cut by this facet: more than one of its
    /// points lies on `side`. The parent side never counts.
    pub fn is_cut_side(&self, key: FacetKey, side: SideKey) -> Result<bool> {
        let data = self.facet_data(key)?;
        if data.parent_side == side {
            return Ok(false);
        }
        let mut count = 0;
        for &p in &data.points {
            if self.point_data(p)?.cut_sides.contains(&side) {
                count += 1;
                if count > 1 {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    // --- Shape tests ---

    /// Compares the facet's corners against a reference shape. Facets with
    /// holes never match.
    pub fn equals_shape(&self, key: FacetKey, shape: ShapeKind) -> Result<bool> {
        if self.facet_data(key)?.has_holes() {
            return Ok(false);
        }
        let corners = self.corner_coordinates(key)?;
        Ok(shape.is_valid(&corners, self.options.planar_tol))
    }

    /// Returns `true` if `points` describes the same loop: any rotation of the
    /// facet's points, in either direction.
    pub fn equals_points(&self, key: FacetKey, points: &[PointKey]) -> Result<bool> {
        let data = self.facet_data(key)?;
        if data.has_holes() {
            return Ok(false);
        }
        Ok(cyclic_equals(&data.points, points))
    }

    /// Returns `true` if the facet is a plain triangle made of `tri`.
    pub fn is_triangle(&self, key: FacetKey, tri: &[PointKey; 3]) -> Result<bool> {
        let data = self.facet_data(key)?;
        Ok(data.points.len() == 3
            && !data.is_triangulated()
            && !data.has_holes()
            && tri.iter().all(|p| data.points.contains(p)))
    }

    /// Returns `true` if `tri` is one of the triangles of the triangulation.
    pub fn is_triangulated_side(&self, key: FacetKey, tri: &[PointKey; 3]) -> Result<bool> {
        let data = self.facet_data(key)?;
        Ok(data
            .triangulation
            .iter()
            .any(|t| tri.iter().all(|p| t.contains(p))))
    }

    /// Returns the third point of a plain triangular facet.
    pub fn other_point(&self, key: FacetKey, p1: PointKey, p2: PointKey) -> Result<PointKey> {
        let data = self.facet_data(key)?;
        if data.has_holes() || data.is_triangulated() || data.points.len() != 3 {
            return Err(Error::TopologyMismatch(
                "plain triangular facet required".to_string(),
            ));
        }
        let mut others = data.points.iter().copied().filter(|&p| p != p1 && p != p2);
        let first = others.next().ok_or(Error::PointNotUnique)?;
        if others.next().is_some() {
            return Err(Error::PointNotUnique);
        }
        Ok(first)
    }
}

/// Returns `true` if `p1` is directly followed or preceded by `p2` in the
/// cyclic sequence.
pub(crate) fn loop_has_line(points: &[PointKey], p1: PointKey, p2: PointKey) -> bool {
    let n = points.len();
    match points.iter().position(|&p| p == p1) {
        Some(i) => points[(i + 1) % n] == p2 || points[(i + n - 1) % n] == p2,
        None => false,
    }
}

/// Cyclic sequence equality, trying the forward rotation first and the
/// reversed rotation second.
pub(crate) fn cyclic_equals(mine: &[PointKey], other: &[PointKey]) -> bool {
    let size = mine.len();
    if size != other.len() || size == 0 {
        return false;
    }
    let Some(shift) = mine.iter().position(|&p| p == other[0]) else {
        return false;
    };

    let forward = (0..size).all(|i| mine[(i + shift) % size] == other[i]);
    forward || (0..size).all(|i| mine[(shift + size - i) % size] == other[i])
}
