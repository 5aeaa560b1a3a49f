// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for one cutting pass.
//!
//! The [`CuttingSession`] is the central owner of all points, sides, facets,
//! volume cells and boundary cells. Every entity lives inside a slot map with
//! stable, generational keys. The only upward index is point → facets, which
//! position propagation and facet lookups by point rely on.
//!
//! Facets keep their volume cells in a two-slot small vector: in a valid cut a
//! facet separates at most two volumes, and a third registration is rejected.

use nalgebra::{Point3, Vector3};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::boundary::{BoundaryCellKind, QuadratureRule};
use crate::error::{Error, Result};
use crate::keys::*;
use crate::options::CutOptions;
use crate::position::Position;

/// Data stored for an intersection point.
#[derive(Debug, Clone)]
pub struct PointData {
    /// Stable id, unique within the session.
    pub id: u32,
    pub x: Point3<f64>,
    pub position: Position,
    /// Id of the mesh node sitting on this point, if any.
    pub cut_node: Option<i32>,
    /// Sides this point lies on.
    pub cut_sides: FxHashSet<SideKey>,
}

/// Data stored for a parent side. A negative id marks a virtual side.
#[derive(Debug, Clone)]
pub struct SideData {
    pub id: i32,
}

/// Data stored for a facet: a closed point loop with optional holes.
#[derive(Debug, Clone)]
pub struct FacetData {
    /// Point loop in winding order.
    pub points: Vec<PointKey>,
    /// True polygon corners; equal to `points` unless corner detection is on.
    pub corner_points: Vec<PointKey>,
    pub parent_side: SideKey,
    pub position: Position,
    pub holes: Vec<FacetKey>,
    /// Centroid fan triangles, empty until the facet is triangulated.
    pub triangulation: Vec<[PointKey; 3]>,
    /// Tri/quad decomposition produced by facet splitting.
    pub split_cells: Vec<Vec<PointKey>>,
    /// Volume cells bounded by this facet (at most two).
    pub cells: SmallVec<[VolumeCellKey; 2]>,

    pub(crate) planar_known: bool,
    pub(crate) planar: bool,
    pub(crate) planar_computed: bool,
    pub(crate) is_planar: bool,
}

impl FacetData {
    fn new(points: Vec<PointKey>, parent_side: SideKey, position: Position) -> Self {
        Self {
            points,
            corner_points: Vec::new(),
            parent_side,
            position,
            holes: Vec::new(),
            triangulation: Vec::new(),
            split_cells: Vec::new(),
            cells: SmallVec::new(),
            planar_known: false,
            planar: false,
            planar_computed: false,
            is_planar: false,
        }
    }

    /// Returns `true` once a centroid fan triangulation exists.
    pub fn is_triangulated(&self) -> bool {
        !self.triangulation.is_empty()
    }

    pub fn has_holes(&self) -> bool {
        !self.holes.is_empty()
    }

    /// Returns `true` if the facet lies on a cut surface.
    pub fn on_cut_side(&self) -> bool {
        self.position == Position::OnCutSurface
    }
}

/// Data stored for a volume cell.
#[derive(Debug, Clone, Default)]
pub struct VolumeCellData {
    pub position: Position,
    pub facets: Vec<FacetKey>,
    pub boundary_cells: Vec<BoundaryCellKey>,
}

/// Data stored for a boundary integration cell.
#[derive(Debug, Clone)]
pub struct BoundaryCellData {
    pub kind: BoundaryCellKind,
    pub volume_cell: VolumeCellKey,
    pub facet: FacetKey,
    pub points: Vec<PointKey>,
    /// Externally supplied rule for arbitrary cells.
    pub quadrature: Option<QuadratureRule>,
    /// Externally supplied normal for arbitrary cells.
    pub normal: Option<Vector3<f64>>,
}

/// The arena owning every entity of one cutting pass.
///
/// # Example
///
/// ```
/// use cut_lite::CuttingSession;
///
/// let mut session = CuttingSession::new();
/// let p0 = session.add_point(0.0, 0.0, 0.0);
/// let p1 = session.add_point(1.0, 0.0, 0.0);
///
/// assert_eq!(session.point_count(), 2);
/// assert_ne!(session.point(p0).unwrap().id, session.point(p1).unwrap().id);
/// ```
#[derive(Debug)]
pub struct CuttingSession {
    pub(crate) options: CutOptions,

    // Entity storage
    pub(crate) points: SlotMap<PointKey, PointData>,
    pub(crate) sides: SlotMap<SideKey, SideData>,
    pub(crate) facets: SlotMap<FacetKey, FacetData>,
    pub(crate) volume_cells: SlotMap<VolumeCellKey, VolumeCellData>,
    pub(crate) boundary_cells: SlotMap<BoundaryCellKey, BoundaryCellData>,

    // Upward adjacency: point → facets registered on it
    pub(crate) point_to_facets: FxHashMap<PointKey, FxHashSet<FacetKey>>,

    pub(crate) next_point_id: u32,
}

impl CuttingSession {
    /// Creates an empty session with default options.
    pub fn new() -> Self {
        Self::with_options(CutOptions::default())
    }

    /// Creates an empty session with the given options.
    pub fn with_options(options: CutOptions) -> Self {
        Self {
            options,
            points: SlotMap::with_key(),
            sides: SlotMap::with_key(),
            facets: SlotMap::with_key(),
            volume_cells: SlotMap::with_key(),
            boundary_cells: SlotMap::with_key(),
            point_to_facets: FxHashMap::default(),
            next_point_id: 0,
        }
    }

    pub fn options(&self) -> &CutOptions {
        &self.options
    }

    // --- Side operations ---

    /// Adds a parent side with the given id (negative for virtual sides).
    pub fn add_side(&mut self, id: i32) -> SideKey {
        self.sides.insert(SideData { id })
    }

    pub fn side(&self, key: SideKey) -> Option<&SideData> {
        self.sides.get(key)
    }

    pub fn side_count(&self) -> usize {
        self.sides.len()
    }

    // --- Point operations ---

    /// Adds an undecided point at the given coordinates.
    pub fn add_point(&mut self, x: f64, y: f64, z: f64) -> PointKey {
        self.insert_point(Point3::new(x, y, z), None)
    }

    /// Creates a point the way the mesh does for synthesized points: with an
    /// optional node and the side it lies on.
    pub fn new_point(
        &mut self,
        x: Point3<f64>,
        cut_node: Option<i32>,
        cut_side: Option<SideKey>,
    ) -> Result<PointKey> {
        if let Some(side) = cut_side {
            self.side_data(side)?;
        }
        let key = self.insert_point(x, cut_node);
        if let Some(side) = cut_side {
            self.points[key].cut_sides.insert(side);
        }
        Ok(key)
    }

    fn insert_point(&mut self, x: Point3<f64>, cut_node: Option<i32>) -> PointKey {
        let id = self.next_point_id;
        self.next_point_id += 1;
        self.points.insert(PointData {
            id,
            x,
            position: Position::Undecided,
            cut_node,
            cut_sides: FxHashSet::default(),
        })
    }

    pub fn point(&self, key: PointKey) -> Option<&PointData> {
        self.points.get(key)
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Returns the coordinates of a point.
    pub fn point_coords(&self, key: PointKey) -> Result<Point3<f64>> {
        Ok(self.point_data(key)?.x)
    }

    // --- Facet, volume cell and boundary cell lookup ---

    pub fn facet(&self, key: FacetKey) -> Option<&FacetData> {
        self.facets.get(key)
    }

    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    pub fn volume_cell(&self, key: VolumeCellKey) -> Option<&VolumeCellData> {
        self.volume_cells.get(key)
    }

    pub fn volume_cell_count(&self) -> usize {
        self.volume_cells.len()
    }

    pub fn boundary_cell(&self, key: BoundaryCellKey) -> Option<&BoundaryCellData> {
        self.boundary_cells.get(key)
    }

    pub fn boundary_cell_count(&self) -> usize {
        self.boundary_cells.len()
    }

    // --- Checked accessors ---

    pub(crate) fn point_data(&self, key: PointKey) -> Result<&PointData> {
        self.points.get(key).ok_or(Error::PointNotFound(key))
    }

    pub(crate) fn side_data(&self, key: SideKey) -> Result<&SideData> {
        self.sides.get(key).ok_or(Error::SideNotFound(key))
    }

    pub(crate) fn facet_data(&self, key: FacetKey) -> Result<&FacetData> {
        self.facets.get(key).ok_or(Error::FacetNotFound(key))
    }

    pub(crate) fn facet_data_mut(&mut self, key: FacetKey) -> Result<&mut FacetData> {
        self.facets.get_mut(key).ok_or(Error::FacetNotFound(key))
    }

    pub(crate) fn cell_data(&self, key: VolumeCellKey) -> Result<&VolumeCellData> {
        self.volume_cells
            .get(key)
            .ok_or(Error::VolumeCellNotFound(key))
    }

    pub(crate) fn cell_data_mut(&mut self, key: VolumeCellKey) -> Result<&mut VolumeCellData> {
        self.volume_cells
            .get_mut(key)
            .ok_or(Error::VolumeCellNotFound(key))
    }

    pub(crate) fn boundary_cell_data(&self, key: BoundaryCellKey) -> Result<&BoundaryCellData> {
        self.boundary_cells
            .get(key)
            .ok_or(Error::BoundaryCellNotFound(key))
    }

    pub(crate) fn coords_of(&self, points: &[PointKey]) -> Result<Vec<Point3<f64>>> {
        points.iter().map(|&p| self.point_coords(p)).collect()
    }

    // --- Storage helpers ---

    pub(crate) fn insert_facet(
        &mut self,
        points: Vec<PointKey>,
        parent_side: SideKey,
        position: Position,
    ) -> FacetKey {
        self.facets.insert(FacetData::new(points, parent_side, position))
    }

    /// Register that a facet uses a point (upward adjacency).
    pub(crate) fn link_point_facet(&mut self, point: PointKey, facet: FacetKey) {
        self.point_to_facets.entry(point).or_default().insert(facet);
    }

    pub(crate) fn unlink_point_facet(&mut self, point: PointKey, facet: FacetKey) {
        if let Some(facets) = self.point_to_facets.get_mut(&point) {
            facets.remove(&facet);
        }
    }
}

impl Default for CuttingSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_empty() {
        let session = CuttingSession::new();
        assert_eq!(session.point_count(), 0);
        assert_eq!(session.side_count(), 0);
        assert_eq!(session.facet_count(), 0);
        assert_eq!(session.volume_cell_count(), 0);
        assert_eq!(session.boundary_cell_count(), 0);
    }

    #[test]
    fn point_ids_are_sequential() {
        let mut session = CuttingSession::new();
        let a = session.add_point(0.0, 0.0, 0.0);
        let b = session.add_point(1.0, 2.0, 3.0);

        assert_eq!(session.point(a).unwrap().id, 0);
        assert_eq!(session.point(b).unwrap().id, 1);
        assert_eq!(session.point_coords(b).unwrap(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(session.point(b).unwrap().position, Position::Undecided);
    }

    #[test]
    fn new_point_records_side_and_node() {
        let mut session = CuttingSession::new();
        let side = session.add_side(7);
        let p = session
            .new_point(Point3::new(0.5, 0.5, 0.0), Some(42), Some(side))
            .unwrap();

        let data = session.point(p).unwrap();
        assert_eq!(data.cut_node, Some(42));
        assert!(data.cut_sides.contains(&side));
    }

    #[test]
    fn new_point_rejects_stale_side() {
        let mut session = CuttingSession::new();
        let side = session.add_side(1);
        session.sides.remove(side);

        let err = session
            .new_point(Point3::origin(), None, Some(side))
            .unwrap_err();
        assert!(matches!(err, Error::SideNotFound(_)));
    }

    #[test]
    fn stale_point_key_is_reported() {
        let mut session = CuttingSession::new();
        let p = session.add_point(0.0, 0.0, 0.0);
        session.points.remove(p);

        assert!(matches!(session.point_coords(p), Err(Error::PointNotFound(_))));
    }

    #[test]
    fn default_creates_empty() {
        let session = CuttingSession::default();
        assert_eq!(session.point_count(), 0);
        assert_eq!(session.options(), &CutOptions::default());
    }
}
