// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for cutting operations.
//!
//! Every variant aborts the cutting pass of the enclosing element. Area
//! mismatches between the two sides of a cut facet are not errors; see
//! [`crate::boundary::AreaMismatch`].

use crate::keys::*;

/// Result type alias for cutting operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building and analysing facets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A facet would bound more than two volume cells.
    #[error("too many volume cells at facet {0:?}")]
    TooManyVolumeCells(FacetKey),

    /// Two points spanning an edge or a basis vector coincide.
    #[error("same point in facet not supported: points {0} and {1} coincide")]
    DegeneratePoints(u32, u32),

    /// The local frame of a facet yields a singular linear system.
    #[error("failed to find point position: singular system (det = {0:e})")]
    SingularSystem(f64),

    /// A position query contradicts the classification state of a facet.
    #[error("inconsistent facet position: {0}")]
    InconsistentPosition(String),

    /// An operation requires a facet shape this facet does not have.
    #[error("topology mismatch: {0}")]
    TopologyMismatch(String),

    /// A facet loop needs at least three points.
    #[error("facet needs at least 3 points, got {0}")]
    TooFewPoints(usize),

    /// Consecutive points of a loop are identical.
    #[error("line creation with identical begin and end points (point {0})")]
    IdenticalLinePoints(u32),

    /// More than one point of a triangle qualifies as the third point.
    #[error("point not unique")]
    PointNotUnique,

    /// The volume cell is not attached to the facet.
    #[error("volume cell {1:?} is not a neighbor of facet {0:?}")]
    NotNeighbor(FacetKey, VolumeCellKey),

    /// A boundary cell was requested with the wrong number of points.
    #[error("{kind} boundary cell expects {expected} points, got {got}")]
    WrongPointCount {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    /// Splitting a facet into tri/quad cells failed.
    #[error("facet splitting failed: {0}")]
    Triangulation(String),

    /// Point key not found in the session.
    #[error("point not found: {0:?}")]
    PointNotFound(PointKey),

    /// Side key not found in the session.
    #[error("side not found: {0:?}")]
    SideNotFound(SideKey),

    /// Facet key not found in the session.
    #[error("facet not found: {0:?}")]
    FacetNotFound(FacetKey),

    /// Volume cell key not found in the session.
    #[error("volume cell not found: {0:?}")]
    VolumeCellNotFound(VolumeCellKey),

    /// Boundary cell key not found in the session.
    #[error("boundary cell not found: {0:?}")]
    BoundaryCellNotFound(BoundaryCellKey),

    /// Invalid cutting options.
    #[error("invalid cut options: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
