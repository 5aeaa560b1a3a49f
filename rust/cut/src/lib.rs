// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Cut-Lite
//!
//! Facet construction and triangulation kernel for cutting finite-element
//! volumes with embedded interfaces.
//!
//! A cutting driver computes intersection points between element edges and a
//! cut surface, then hands closed point loops to this crate. Every loop becomes
//! a [`Facet`](session::FacetData) living in a [`CuttingSession`] arena together
//! with its points, parent sides, volume cells and boundary cells. Entities
//! reference each other through generational slot map keys, so the cyclic
//! point ↔ facet ↔ volume cell graph carries no lifetimes.
//!
//! The session then answers the questions downstream integration code asks:
//!
//! - Is a facet planar, and if not, what is its centroid fan triangulation?
//! - Which position (inside, outside, on the cut surface) does a facet have,
//!   and how does a decided position spread to points and volume cells?
//! - Which tri3 / quad4 / arbitrary boundary cells cover a facet, and do the
//!   two volume cells at a cut facet see the same interface area?
//!
//! ```
//! use cut_lite::{CuttingSession, Position};
//!
//! let mut session = CuttingSession::new();
//! let side = session.add_side(-1);
//! let p = [
//!     session.add_point(0.0, 0.0, 0.0),
//!     session.add_point(1.0, 0.0, 0.0),
//!     session.add_point(1.0, 1.0, 0.0),
//!     session.add_point(0.0, 1.0, 0.0),
//! ];
//! let facet = session.add_facet(p.to_vec(), side, false).unwrap();
//!
//! assert_eq!(session.facet_position(facet).unwrap(), Position::Undecided);
//! assert!(session.is_planar(facet, false).unwrap());
//! ```

pub mod boundary;
pub mod error;
pub mod facet;
pub mod keys;
pub mod mapping;
pub mod options;
pub mod planarity;
pub mod plot;
pub mod point;
pub mod position;
pub mod propagation;
pub mod serialization;
pub mod session;
pub mod shape;
pub mod triangulation;
pub mod volume_cell;

pub use boundary::{AreaMismatch, BoundaryCellKind, QuadratureRule};
pub use error::{Error, Result};
pub use facet::LineMap;
pub use keys::{BoundaryCellKey, FacetKey, PointKey, SideKey, VolumeCellKey};
pub use mapping::{ElementMapping, NodeRegistry};
pub use options::CutOptions;
pub use planarity::LocalFrame;
pub use plot::{FacetDisplay, FacetPlot};
pub use position::Position;
pub use serialization::SessionSnapshot;
pub use session::{
    BoundaryCellData, CuttingSession, FacetData, PointData, SideData, VolumeCellData,
};
pub use shape::ShapeKind;
