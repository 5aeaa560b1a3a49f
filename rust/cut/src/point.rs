// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point-level operations: position tags, side membership, facet lookup and
//! node ids.

use crate::error::{Error, Result};
use crate::keys::*;
use crate::mapping::NodeRegistry;
use crate::position::Position;
use crate::propagation::Propagation;
use crate::session::CuttingSession;

impl CuttingSession {
    /// Returns the position tag of a point.
    pub fn point_position(&self, key: PointKey) -> Result<Position> {
        Ok(self.point_data(key)?.position)
    }

    /// Sets the position of a point.
    ///
    /// An inside or outside position is handed on to every facet registered on
    /// the point, and from there to its points and volume cells. Callers must
    /// not flip an already decided point; doing so is logged.
    pub fn set_point_position(&mut self, key: PointKey, pos: Position) -> Result<()> {
        let current = self.point_data(key)?.position;
        if current != Position::Undecided && current != pos {
            tracing::warn!(point = self.points[key].id, from = %current, to = %pos, "overwriting decided point position");
        }
        self.propagate(Propagation::Point(key, pos))
    }

    /// Registers a facet on a point so that it can be found from the point.
    pub fn register_point_facet(&mut self, point: PointKey, facet: FacetKey) -> Result<()> {
        self.point_data(point)?;
        self.facet_data(facet)?;
        self.link_point_facet(point, facet);
        Ok(())
    }

    /// Returns every facet registered on a point.
    pub fn point_facets(&self, key: PointKey) -> Vec<FacetKey> {
        self.point_to_facets
            .get(&key)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Records that a point lies on a side.
    pub fn add_cut_side(&mut self, point: PointKey, side: SideKey) -> Result<()> {
        self.side_data(side)?;
        self.points
            .get_mut(point)
            .ok_or(Error::PointNotFound(point))?
            .cut_sides
            .insert(side);
        Ok(())
    }

    /// Returns `true` if the point lies on the given side.
    pub fn is_cut(&self, point: PointKey, side: SideKey) -> Result<bool> {
        Ok(self.point_data(point)?.cut_sides.contains(&side))
    }

    /// Returns the node sitting on a point, if any.
    pub fn cut_node(&self, point: PointKey) -> Result<Option<i32>> {
        Ok(self.point_data(point)?.cut_node)
    }

    /// Attaches a mesh node to a point.
    pub fn set_cut_node(&mut self, point: PointKey, node: i32) -> Result<()> {
        self.points
            .get_mut(point)
            .ok_or(Error::PointNotFound(point))?
            .cut_node = Some(node);
        Ok(())
    }

    /// Returns a node id for every point: the attached node where one exists,
    /// otherwise a node obtained from the registry.
    pub fn nodal_ids<R: NodeRegistry>(
        &self,
        points: &[PointKey],
        registry: &mut R,
    ) -> Result<Vec<i32>> {
        points
            .iter()
            .map(|&p| {
                let data = self.point_data(p)?;
                Ok(match data.cut_node {
                    Some(node) => node,
                    None => registry.node_for_point(data.id, &data.x),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    struct CountingRegistry {
        next: i32,
        requested: Vec<u32>,
    }

    impl NodeRegistry for CountingRegistry {
        fn node_for_point(&mut self, point_id: u32, _x: &Point3<f64>) -> i32 {
            self.requested.push(point_id);
            self.next += 1;
            self.next
        }
    }

    #[test]
    fn cut_side_membership() {
        let mut session = CuttingSession::new();
        let side = session.add_side(3);
        let other = session.add_side(4);
        let p = session.add_point(0.0, 0.0, 0.0);

        session.add_cut_side(p, side).unwrap();
        assert!(session.is_cut(p, side).unwrap());
        assert!(!session.is_cut(p, other).unwrap());
    }

    #[test]
    fn nodal_ids_prefer_attached_nodes() {
        let mut session = CuttingSession::new();
        let a = session.add_point(0.0, 0.0, 0.0);
        let b = session.add_point(1.0, 0.0, 0.0);
        session.set_cut_node(a, 17).unwrap();

        let mut registry = CountingRegistry {
            next: 100,
            requested: Vec::new(),
        };
        let ids = session.nodal_ids(&[a, b], &mut registry).unwrap();

        assert_eq!(ids, vec![17, 101]);
        assert_eq!(registry.requested, vec![session.point(b).unwrap().id]);
    }

    #[test]
    fn point_position_spreads_to_facets() {
        let mut session = CuttingSession::new();
        let side = session.add_side(-1);
        let p = [
            session.add_point(0.0, 0.0, 0.0),
            session.add_point(1.0, 0.0, 0.0),
            session.add_point(0.0, 1.0, 0.0),
        ];
        let facet = session.add_facet(p.to_vec(), side, false).unwrap();

        session.set_point_position(p[0], Position::Outside).unwrap();

        assert_eq!(session.facet_position(facet).unwrap(), Position::Outside);
        assert_eq!(session.point_position(p[1]).unwrap(), Position::Outside);
        assert_eq!(session.point_position(p[2]).unwrap(), Position::Outside);
    }

    #[test]
    fn point_position_crosses_volume_cells() {
        let mut session = CuttingSession::new();
        let side = session.add_side(-1);
        let p = [
            session.add_point(0.0, 0.0, 0.0),
            session.add_point(1.0, 0.0, 0.0),
            session.add_point(0.0, 1.0, 0.0),
            session.add_point(0.0, 0.0, 1.0),
            session.add_point(1.0, 0.0, 1.0),
            session.add_point(0.0, 1.0, 1.0),
        ];
        let bottom = session.add_facet(vec![p[0], p[1], p[2]], side, false).unwrap();
        let top = session.add_facet(vec![p[3], p[4], p[5]], side, false).unwrap();
        let cell = session.add_volume_cell(&[bottom, top]).unwrap();

        session.set_point_position(p[2], Position::Inside).unwrap();

        // bottom and top share no point: top is reached through the cell
        assert_eq!(session.volume_cell_position(cell).unwrap(), Position::Inside);
        assert_eq!(session.facet_position(top).unwrap(), Position::Inside);
        for &q in &p {
            assert_eq!(session.point_position(q).unwrap(), Position::Inside);
        }
    }

    #[test]
    fn on_cut_surface_point_does_not_spread() {
        let mut session = CuttingSession::new();
        let side = session.add_side(-1);
        let p = [
            session.add_point(0.0, 0.0, 0.0),
            session.add_point(1.0, 0.0, 0.0),
            session.add_point(0.0, 1.0, 0.0),
        ];
        let facet = session.add_facet(p.to_vec(), side, false).unwrap();

        session.set_point_position(p[0], Position::OnCutSurface).unwrap();

        assert_eq!(session.facet_position(facet).unwrap(), Position::Undecided);
        assert_eq!(session.point_position(p[1]).unwrap(), Position::Undecided);
    }
}
