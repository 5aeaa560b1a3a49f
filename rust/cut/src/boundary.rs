// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary integration cells and the two-sided area check.
//!
//! Boundary cells cover the part of a facet that bounds one volume cell. They
//! are owned by the session and listed on their volume cell; a facet shared by
//! two volume cells therefore carries two independent sets of cells whose
//! areas should agree.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::*;
use crate::planarity::newell_normal;
use crate::session::{BoundaryCellData, CuttingSession};

/// Shape of a boundary cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCellKind {
    Tri3,
    Quad4,
    /// Polygon integrated with an externally supplied rule.
    Arbitrary,
}

impl BoundaryCellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryCellKind::Tri3 => "tri3",
            BoundaryCellKind::Quad4 => "quad4",
            BoundaryCellKind::Arbitrary => "arbitrary",
        }
    }
}

/// Integration points and weights in global coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuadratureRule {
    pub points: Vec<[f64; 3]>,
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Area sums of the two volume cells at a cut facet that disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaMismatch {
    pub first: f64,
    pub second: f64,
    /// `first - second`
    pub diff: f64,
}

impl CuttingSession {
    /// Creates a tri3 boundary cell and appends its key to `out`.
    pub fn new_tri3_cell(
        &mut self,
        volume: VolumeCellKey,
        facet: FacetKey,
        points: &[PointKey],
        out: &mut Vec<BoundaryCellKey>,
    ) -> Result<()> {
        check_point_count(BoundaryCellKind::Tri3, 3, points.len())?;
        let key = self.insert_boundary_cell(BoundaryCellKind::Tri3, volume, facet, points, None, None)?;
        out.push(key);
        Ok(())
    }

    /// Creates a quad4 boundary cell and appends its key to `out`.
    ///
    /// With `gen_quad4` disabled the quad is emitted as the two triangles
    /// `(p0, p1, p2)` and `(p0, p2, p3)`.
    pub fn new_quad4_cell(
        &mut self,
        volume: VolumeCellKey,
        facet: FacetKey,
        points: &[PointKey],
        out: &mut Vec<BoundaryCellKey>,
    ) -> Result<()> {
        check_point_count(BoundaryCellKind::Quad4, 4, points.len())?;
        if self.options.gen_quad4 {
            let key =
                self.insert_boundary_cell(BoundaryCellKind::Quad4, volume, facet, points, None, None)?;
            out.push(key);
        } else {
            self.new_tri3_cell(volume, facet, &[points[0], points[1], points[2]], out)?;
            self.new_tri3_cell(volume, facet, &[points[0], points[2], points[3]], out)?;
        }
        Ok(())
    }

    /// Creates a polygonal boundary cell with its own quadrature rule and
    /// normal, and appends its key to `out`.
    pub fn new_arbitrary_cell(
        &mut self,
        volume: VolumeCellKey,
        facet: FacetKey,
        points: &[PointKey],
        quadrature: QuadratureRule,
        normal: Vector3<f64>,
        out: &mut Vec<BoundaryCellKey>,
    ) -> Result<()> {
        if points.len() < 3 {
            return Err(Error::WrongPointCount {
                kind: BoundaryCellKind::Arbitrary.as_str(),
                expected: 3,
                got: points.len(),
            });
        }
        if quadrature.points.len() != quadrature.weights.len() {
            return Err(Error::TopologyMismatch(format!(
                "quadrature rule has {} points but {} weights",
                quadrature.points.len(),
                quadrature.weights.len()
            )));
        }
        let key = self.insert_boundary_cell(
            BoundaryCellKind::Arbitrary,
            volume,
            facet,
            points,
            Some(quadrature),
            Some(normal),
        )?;
        out.push(key);
        Ok(())
    }

    fn insert_boundary_cell(
        &mut self,
        kind: BoundaryCellKind,
        volume: VolumeCellKey,
        facet: FacetKey,
        points: &[PointKey],
        quadrature: Option<QuadratureRule>,
        normal: Option<Vector3<f64>>,
    ) -> Result<BoundaryCellKey> {
        self.facet_data(facet)?;
        self.cell_data(volume)?;
        for &p in points {
            self.point_data(p)?;
        }

        let key = self.boundary_cells.insert(BoundaryCellData {
            kind,
            volume_cell: volume,
            facet,
            points: points.to_vec(),
            quadrature,
            normal,
        });
        self.cell_data_mut(volume)?.boundary_cells.push(key);
        tracing::trace!(cell = ?key, kind = kind.as_str(), ?facet, ?volume, "created boundary cell");
        Ok(key)
    }

    /// Area of a boundary cell, computed from its points.
    pub fn boundary_cell_area(&self, key: BoundaryCellKey) -> Result<f64> {
        let cell = self.boundary_cell_data(key)?;
        let coords = self.coords_of(&cell.points)?;
        Ok(match cell.kind {
            BoundaryCellKind::Tri3 => {
                (coords[1] - coords[0]).cross(&(coords[2] - coords[0])).norm() * 0.5
            }
            BoundaryCellKind::Quad4 | BoundaryCellKind::Arbitrary => {
                newell_normal(&coords).norm() * 0.5
            }
        })
    }

    /// Unit normal of a boundary cell following its point order. Arbitrary
    /// cells report the normal they were created with.
    pub fn boundary_cell_normal(&self, key: BoundaryCellKey) -> Result<Vector3<f64>> {
        let cell = self.boundary_cell_data(key)?;
        if let Some(normal) = cell.normal {
            return Ok(normal);
        }
        let coords = self.coords_of(&cell.points)?;
        newell_normal(&coords)
            .try_normalize(0.0)
            .ok_or_else(|| Error::TopologyMismatch(format!("boundary cell {key:?} has zero area")))
    }

    /// Collects the boundary cells of a facet from all its volume cells.
    pub fn facet_boundary_cells(&self, facet: FacetKey) -> Result<Vec<BoundaryCellKey>> {
        let cells = &self.facet_data(facet)?.cells;
        if cells.is_empty() {
            return Err(Error::TopologyMismatch(format!(
                "no volume cells at facet {facet:?}"
            )));
        }

        let mut out = Vec::new();
        for &vc in cells {
            for &bc in &self.cell_data(vc)?.boundary_cells {
                if self.boundary_cell_data(bc)?.facet == facet {
                    out.push(bc);
                }
            }
        }
        Ok(out)
    }

    /// [`test_facet_area`](Self::test_facet_area) with the session's
    /// `area_tol`.
    pub fn check_facet_area(&self, facet: FacetKey) -> Result<Option<AreaMismatch>> {
        self.test_facet_area(facet, self.options.area_tol)
    }

    /// Compares the boundary cell areas the two volume cells of a cut facet
    /// contribute.
    ///
    /// Facets off the cut surface are not checked. A difference of at least
    /// `tolerance` is logged and returned; it does not abort the pass.
    pub fn test_facet_area(&self, facet: FacetKey, tolerance: f64) -> Result<Option<AreaMismatch>> {
        let data = self.facet_data(facet)?;
        if !data.on_cut_side() {
            return Ok(None);
        }
        if data.cells.len() != 2 {
            return Err(Error::TopologyMismatch(format!(
                "expect two volume cells at facet {facet:?}, found {}",
                data.cells.len()
            )));
        }

        let mut area = [0.0; 2];
        for (sum, &vc) in area.iter_mut().zip(&data.cells) {
            for &bc in &self.cell_data(vc)?.boundary_cells {
                if self.boundary_cell_data(bc)?.facet == facet {
                    *sum += self.boundary_cell_area(bc)?;
                }
            }
        }

        let diff = area[0] - area[1];
        if diff.abs() >= tolerance {
            tracing::warn!(
                ?facet,
                a1 = area[0],
                a2 = area[1],
                diff,
                "area mismatch between volume cells"
            );
            return Ok(Some(AreaMismatch {
                first: area[0],
                second: area[1],
                diff,
            }));
        }
        Ok(None)
    }
}

fn check_point_count(kind: BoundaryCellKind, expected: usize, got: usize) -> Result<()> {
    if got != expected {
        return Err(Error::WrongPointCount {
            kind: kind.as_str(),
            expected,
            got,
        });
    }
    Ok(())
}
