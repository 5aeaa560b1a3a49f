// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Seams to the element and node layers of the surrounding mesh.

use nalgebra::Point3;

use crate::error::Result;

/// Maps global coordinates into the parameter space of a finite element.
pub trait ElementMapping {
    /// Returns the local coordinates of a global point.
    fn local_coordinates(&self, x: &Point3<f64>) -> Result<Point3<f64>>;

    /// Returns `true` if the element was derived from a higher-order parent
    /// ("shadow" element) whose quadratic mapping should be used on request.
    fn is_shadow(&self) -> bool {
        false
    }

    /// Local coordinates with respect to the quadratic parent element.
    fn local_coordinates_quad(&self, x: &Point3<f64>) -> Result<Point3<f64>> {
        self.local_coordinates(x)
    }
}

/// Supplies node ids for points that carry no node yet.
pub trait NodeRegistry {
    fn node_for_point(&mut self, point_id: u32, x: &Point3<f64>) -> i32;
}
