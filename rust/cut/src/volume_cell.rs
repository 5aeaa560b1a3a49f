// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Volume cells: closed sets of facets bounding one piece of a cut element.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::keys::*;
use crate::position::Position;
use crate::propagation::Propagation;
use crate::session::{CuttingSession, VolumeCellData};

impl CuttingSession {
    /// Creates an undecided volume cell bounded by `facets` and registers it on
    /// each of them.
    ///
    /// Fails without modifying the session if a facet already separates two
    /// other volume cells.
    pub fn add_volume_cell(&mut self, facets: &[FacetKey]) -> Result<VolumeCellKey> {
        let mut unique = Vec::with_capacity(facets.len());
        let mut seen = FxHashSet::default();
        for &f in facets {
            if seen.insert(f) {
                if self.facet_data(f)?.cells.len() >= 2 {
                    return Err(Error::TooManyVolumeCells(f));
                }
                unique.push(f);
            }
        }

        let key = self.volume_cells.insert(VolumeCellData {
            facets: unique.clone(),
            ..VolumeCellData::default()
        });
        for f in unique {
            self.register_volume_cell(f, key)?;
        }
        tracing::trace!(cell = ?key, facets = facets.len(), "created volume cell");
        Ok(key)
    }

    /// Removes a volume cell, detaching it from its facets and dropping its
    /// boundary cells.
    pub fn remove_volume_cell(&mut self, key: VolumeCellKey) -> Result<()> {
        let data = self
            .volume_cells
            .remove(key)
            .ok_or(Error::VolumeCellNotFound(key))?;
        for f in data.facets {
            if let Some(facet) = self.facets.get_mut(f) {
                facet.cells.retain(|c| *c != key);
            }
        }
        for bc in data.boundary_cells {
            self.boundary_cells.remove(bc);
        }
        Ok(())
    }

    pub fn volume_cell_position(&self, key: VolumeCellKey) -> Result<Position> {
        Ok(self.cell_data(key)?.position)
    }

    /// Sets the position of a volume cell and hands it to its undecided
    /// facets.
    pub fn set_volume_cell_position(&mut self, key: VolumeCellKey, pos: Position) -> Result<()> {
        self.propagate(Propagation::VolumeCell(key, pos))
    }

    pub fn volume_cell_facets(&self, key: VolumeCellKey) -> Result<&[FacetKey]> {
        Ok(&self.cell_data(key)?.facets)
    }

    pub fn volume_cell_boundary_cells(&self, key: VolumeCellKey) -> Result<&[BoundaryCellKey]> {
        Ok(&self.cell_data(key)?.boundary_cells)
    }

    /// Collects the points of all facets of a volume cell, each once.
    pub fn volume_cell_points(&mut self, key: VolumeCellKey) -> Result<Vec<PointKey>> {
        let facets = self.cell_data(key)?.facets.clone();
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for f in facets {
            for p in self.get_all_points(f, false)? {
                if seen.insert(p) {
                    out.push(p);
                }
            }
        }
        Ok(out)
    }

    /// Returns `true` if any facet of the volume cell contains the point.
    pub fn volume_cell_contains(&self, key: VolumeCellKey, point: PointKey) -> Result<bool> {
        for &f in &self.cell_data(key)?.facets {
            if self.contains(f, point)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Collects the volume cells reachable from `start` through shared facets,
    /// restricted to `allowed`. `start` itself is always part of the result.
    ///
    /// With a `point`, facets containing the point are crossed first, so that
    /// cells attached to the point win when a thin structure offers several
    /// connections.
    pub fn connected_cells(
        &self,
        start: VolumeCellKey,
        allowed: &FxHashSet<VolumeCellKey>,
        point: Option<PointKey>,
    ) -> Result<Vec<VolumeCellKey>> {
        self.cell_data(start)?;
        let mut connected = vec![start];
        let mut visited: FxHashSet<VolumeCellKey> = FxHashSet::default();
        visited.insert(start);
        let mut queue = VecDeque::from([start]);

        while let Some(cell) = queue.pop_front() {
            let facets = &self.cell_data(cell)?.facets;

            let mut ordered = Vec::with_capacity(facets.len());
            match point {
                Some(p) => {
                    let mut rest = Vec::new();
                    for &f in facets {
                        if self.contains(f, p)? {
                            ordered.push(f);
                        } else {
                            rest.push(f);
                        }
                    }
                    ordered.extend(rest);
                }
                None => ordered.extend_from_slice(facets),
            }

            for f in ordered {
                for &next in &self.facet_data(f)?.cells {
                    if allowed.contains(&next) && visited.insert(next) {
                        connected.push(next);
                        queue.push_back(next);
                    }
                }
            }
        }
        Ok(connected)
    }
}
