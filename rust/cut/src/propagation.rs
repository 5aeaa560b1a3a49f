// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Position propagation between facets, points and volume cells.
//!
//! A decided bulk position (inside or outside) spreads along three rules:
//!
//! - a facet leaving `Undecided` hands its position to every undecided point
//!   of its loop and to every registered volume cell;
//! - a point that becomes inside or outside hands its position to every
//!   facet registered on it;
//! - a volume cell whose position changes hands it to its undecided facets.
//!
//! Facets only ever change once, so the cascade terminates. It runs on an
//! explicit work queue instead of recursing through the entity graph.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::keys::*;
use crate::position::Position;
use crate::session::CuttingSession;

/// One pending position assignment.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Propagation {
    Facet(FacetKey, Position),
    Point(PointKey, Position),
    /// Applied only if the point is still undecided when dequeued.
    UndecidedPoint(PointKey, Position),
    VolumeCell(VolumeCellKey, Position),
}

impl CuttingSession {
    /// Runs the position cascade starting from a single assignment.
    pub(crate) fn propagate(&mut self, start: Propagation) -> Result<()> {
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(step) = queue.pop_front() {
            match step {
                Propagation::Facet(key, pos) => self.apply_facet_position(key, pos, &mut queue)?,
                Propagation::Point(key, pos) => self.apply_point_position(key, pos, &mut queue)?,
                Propagation::UndecidedPoint(key, pos) => {
                    if self.point_data(key)?.position == Position::Undecided {
                        self.apply_point_position(key, pos, &mut queue)?;
                    }
                }
                Propagation::VolumeCell(key, pos) => {
                    self.apply_cell_position(key, pos, &mut queue)?
                }
            }
        }
        Ok(())
    }

    fn apply_facet_position(
        &mut self,
        key: FacetKey,
        pos: Position,
        queue: &mut VecDeque<Propagation>,
    ) -> Result<()> {
        let strict = self.options.strict_positions;
        let facet = self.facet_data_mut(key)?;
        let current = facet.position;

        if current.conflicts_with(pos) {
            tracing::warn!(
                facet = ?key,
                from = %current,
                to = %pos,
                "facet position flips between inside and outside"
            );
            if strict {
                return Err(Error::InconsistentPosition(format!(
                    "facet {key:?} cannot change from {current} to {pos}"
                )));
            }
        }

        if current != Position::Undecided || pos == Position::Undecided {
            return Ok(());
        }

        facet.position = pos;
        if !pos.is_bulk() {
            return Ok(());
        }

        let points = facet.points.clone();
        let cells = facet.cells.clone();
        for p in points {
            if self.point_data(p)?.position == Position::Undecided {
                queue.push_back(Propagation::UndecidedPoint(p, pos));
            }
        }
        for c in cells {
            queue.push_back(Propagation::VolumeCell(c, pos));
        }
        Ok(())
    }

    fn apply_point_position(
        &mut self,
        key: PointKey,
        pos: Position,
        queue: &mut VecDeque<Propagation>,
    ) -> Result<()> {
        let point = self
            .points
            .get_mut(key)
            .ok_or(Error::PointNotFound(key))?;
        if point.position == pos {
            return Ok(());
        }
        point.position = pos;

        if pos.is_bulk() {
            if let Some(facets) = self.point_to_facets.get(&key) {
                for &f in facets {
                    let facet_pos = self.facets.get(f).map(|facet| facet.position);
                    if facet_pos.is_some_and(|fp| fp != pos) {
                        queue.push_back(Propagation::Facet(f, pos));
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_cell_position(
        &mut self,
        key: VolumeCellKey,
        pos: Position,
        queue: &mut VecDeque<Propagation>,
    ) -> Result<()> {
        let cell = self.cell_data_mut(key)?;
        if cell.position == pos {
            return Ok(());
        }
        cell.position = pos;

        let facets = cell.facets.clone();
        for f in facets {
            if self.facet_data(f)?.position == Position::Undecided {
                queue.push_back(Propagation::Facet(f, pos));
            }
        }
        Ok(())
    }
}
