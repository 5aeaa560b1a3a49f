// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON snapshots of a cutting session.
//!
//! Slot map keys are replaced by indices into the snapshot's entity arrays,
//! so a snapshot can be inspected by hand or reloaded into a fresh session.
//! Memoized planarity is not stored and is recomputed on demand.

use nalgebra::{Point3, Vector3};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use slotmap::Key;
use smallvec::SmallVec;

use crate::boundary::{BoundaryCellKind, QuadratureRule};
use crate::error::{Error, Result};
use crate::keys::*;
use crate::options::CutOptions;
use crate::position::Position;
use crate::session::*;

/// Serializable representation of a whole session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub options: CutOptions,
    pub points: Vec<PointSnapshot>,
    pub sides: Vec<SideSnapshot>,
    pub facets: Vec<FacetSnapshot>,
    pub volume_cells: Vec<VolumeCellSnapshot>,
    pub boundary_cells: Vec<BoundaryCellSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointSnapshot {
    /// Stable point id, not an index.
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_node: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cut_sides: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SideSnapshot {
    pub id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FacetSnapshot {
    pub id: usize,
    pub points: Vec<usize>,
    pub corner_points: Vec<usize>,
    pub side: usize,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triangulation: Vec<[usize; 3]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub split_cells: Vec<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VolumeCellSnapshot {
    pub id: usize,
    pub position: Position,
    pub facets: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boundary_cells: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BoundaryCellSnapshot {
    pub id: usize,
    pub kind: BoundaryCellKind,
    pub volume_cell: usize,
    pub facet: usize,
    pub points: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadrature: Option<QuadratureRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<[f64; 3]>,
}

/// Key → sequential index for one entity kind.
struct IndexMap<K: Key> {
    what: &'static str,
    ids: FxHashMap<K, usize>,
}

impl<K: Key> IndexMap<K> {
    fn new<V>(what: &'static str, map: &slotmap::SlotMap<K, V>) -> Self {
        let ids = map.keys().enumerate().map(|(i, k)| (k, i)).collect();
        Self { what, ids }
    }

    fn get(&self, key: K) -> Result<usize> {
        self.ids
            .get(&key)
            .copied()
            .ok_or_else(|| Error::Serialization(format!("dangling {} reference", self.what)))
    }

    fn all<'a>(&self, keys: impl IntoIterator<Item = &'a K>) -> Result<Vec<usize>>
    where
        K: 'a,
    {
        keys.into_iter().map(|&k| self.get(k)).collect()
    }
}

fn key_at<K: Copy>(keys: &[K], index: usize, what: &str) -> Result<K> {
    keys.get(index)
        .copied()
        .ok_or_else(|| Error::Serialization(format!("{what} index {index} out of range")))
}

fn keys_at<K: Copy>(keys: &[K], indices: &[usize], what: &str) -> Result<Vec<K>> {
    indices.iter().map(|&i| key_at(keys, i, what)).collect()
}

impl CuttingSession {
    /// Serializes the session to a pretty-printed JSON string.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = self.to_snapshot()?;
        serde_json::to_string_pretty(&snapshot).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Creates a serializable snapshot with sequential indices.
    pub fn to_snapshot(&self) -> Result<SessionSnapshot> {
        let point_ids = IndexMap::new("point", &self.points);
        let side_ids = IndexMap::new("side", &self.sides);
        let facet_ids = IndexMap::new("facet", &self.facets);
        let cell_ids = IndexMap::new("volume cell", &self.volume_cells);
        let bcell_ids = IndexMap::new("boundary cell", &self.boundary_cells);

        let points = self
            .points
            .values()
            .map(|p| {
                Ok(PointSnapshot {
                    id: p.id,
                    x: p.x.x,
                    y: p.x.y,
                    z: p.x.z,
                    position: p.position,
                    cut_node: p.cut_node,
                    cut_sides: side_ids.all(&p.cut_sides)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let sides = self
            .sides
            .values()
            .map(|s| SideSnapshot { id: s.id })
            .collect();

        let facets = self
            .facets
            .iter()
            .enumerate()
            .map(|(i, (_, f))| {
                Ok(FacetSnapshot {
                    id: i,
                    points: point_ids.all(&f.points)?,
                    corner_points: point_ids.all(&f.corner_points)?,
                    side: side_ids.get(f.parent_side)?,
                    position: f.position,
                    holes: facet_ids.all(&f.holes)?,
                    triangulation: f
                        .triangulation
                        .iter()
                        .map(|t| {
                            Ok([
                                point_ids.get(t[0])?,
                                point_ids.get(t[1])?,
                                point_ids.get(t[2])?,
                            ])
                        })
                        .collect::<Result<_>>()?,
                    split_cells: f
                        .split_cells
                        .iter()
                        .map(|c| point_ids.all(c))
                        .collect::<Result<_>>()?,
                    cells: cell_ids.all(&f.cells)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let volume_cells = self
            .volume_cells
            .iter()
            .enumerate()
            .map(|(i, (_, c))| {
                Ok(VolumeCellSnapshot {
                    id: i,
                    position: c.position,
                    facets: facet_ids.all(&c.facets)?,
                    boundary_cells: bcell_ids.all(&c.boundary_cells)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let boundary_cells = self
            .boundary_cells
            .iter()
            .enumerate()
            .map(|(i, (_, b))| {
                Ok(BoundaryCellSnapshot {
                    id: i,
                    kind: b.kind,
                    volume_cell: cell_ids.get(b.volume_cell)?,
                    facet: facet_ids.get(b.facet)?,
                    points: point_ids.all(&b.points)?,
                    quadrature: b.quadrature.clone(),
                    normal: b.normal.map(|n| [n.x, n.y, n.z]),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SessionSnapshot {
            options: self.options.clone(),
            points,
            sides,
            facets,
            volume_cells,
            boundary_cells,
        })
    }

    /// Deserializes a session from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: SessionSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Self::from_snapshot(&snapshot)
    }

    /// Rebuilds a session from a snapshot, including the point → facet index.
    pub fn from_snapshot(snap: &SessionSnapshot) -> Result<Self> {
        snap.options.validate()?;
        let mut session = CuttingSession::with_options(snap.options.clone());

        let side_keys: Vec<SideKey> = snap.sides.iter().map(|s| session.add_side(s.id)).collect();

        let mut point_keys = Vec::with_capacity(snap.points.len());
        let mut seen_ids = FxHashSet::default();
        for ps in &snap.points {
            if !seen_ids.insert(ps.id) {
                return Err(Error::Serialization(format!("duplicate point id {}", ps.id)));
            }
            let cut_sides = keys_at(&side_keys, &ps.cut_sides, "side")?;
            point_keys.push(session.points.insert(PointData {
                id: ps.id,
                x: Point3::new(ps.x, ps.y, ps.z),
                position: ps.position,
                cut_node: ps.cut_node,
                cut_sides: cut_sides.into_iter().collect(),
            }));
        }
        session.next_point_id = snap.points.iter().map(|p| p.id + 1).max().unwrap_or(0);

        // Facets first without cross references, then holes and cells.
        let mut facet_keys = Vec::with_capacity(snap.facets.len());
        for fs in &snap.facets {
            let points = keys_at(&point_keys, &fs.points, "point")?;
            session.check_loop(&points)?;
            let side = key_at(&side_keys, fs.side, "side")?;
            let key = session.insert_facet(points, side, fs.position);
            let data = &mut session.facets[key];
            data.corner_points = keys_at(&point_keys, &fs.corner_points, "point")?;
            data.triangulation = fs
                .triangulation
                .iter()
                .map(|t| {
                    Ok([
                        key_at(&point_keys, t[0], "point")?,
                        key_at(&point_keys, t[1], "point")?,
                        key_at(&point_keys, t[2], "point")?,
                    ])
                })
                .collect::<Result<_>>()?;
            data.split_cells = fs
                .split_cells
                .iter()
                .map(|c| keys_at(&point_keys, c, "point"))
                .collect::<Result<_>>()?;
            if data.is_triangulated() {
                data.planar_known = true;
                data.planar = false;
            }
            session.find_corner_points(key)?;
            facet_keys.push(key);
        }

        let mut cell_keys = Vec::with_capacity(snap.volume_cells.len());
        for cs in &snap.volume_cells {
            let facets = keys_at(&facet_keys, &cs.facets, "facet")?;
            cell_keys.push(session.volume_cells.insert(VolumeCellData {
                position: cs.position,
                facets,
                boundary_cells: Vec::new(),
            }));
        }

        for (fs, &key) in snap.facets.iter().zip(&facet_keys) {
            let holes = keys_at(&facet_keys, &fs.holes, "facet")?;
            let cells = keys_at(&cell_keys, &fs.cells, "volume cell")?;
            if cells.len() > 2 {
                return Err(Error::TooManyVolumeCells(key));
            }
            let data = &mut session.facets[key];
            data.holes = holes;
            data.cells = SmallVec::from_vec(cells);
        }

        let mut bcell_keys = Vec::with_capacity(snap.boundary_cells.len());
        for bs in &snap.boundary_cells {
            bcell_keys.push(session.boundary_cells.insert(BoundaryCellData {
                kind: bs.kind,
                volume_cell: key_at(&cell_keys, bs.volume_cell, "volume cell")?,
                facet: key_at(&facet_keys, bs.facet, "facet")?,
                points: keys_at(&point_keys, &bs.points, "point")?,
                quadrature: bs.quadrature.clone(),
                normal: bs.normal.map(|n| Vector3::new(n[0], n[1], n[2])),
            }));
        }
        for (cs, &key) in snap.volume_cells.iter().zip(&cell_keys) {
            session.volume_cells[key].boundary_cells =
                keys_at(&bcell_keys, &cs.boundary_cells, "boundary cell")?;
        }

        for &key in &facet_keys {
            let data = &session.facets[key];
            let mut used: Vec<PointKey> = data.points.clone();
            used.extend(data.triangulation.iter().flatten().copied());
            for &hole in &data.holes {
                used.extend(session.facets[hole].points.iter().copied());
            }
            for p in used {
                session.link_point_facet(p, key);
            }
        }

        Ok(session)
    }
}
