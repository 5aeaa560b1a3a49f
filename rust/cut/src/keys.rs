// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for the cutting session arena.
//!
//! Each entity gets a unique, type-safe key for O(1) lookup in the session.
//! Keys are created by `slotmap::SlotMap` and remain valid even after other
//! entities are removed (generational indices).

use slotmap::new_key_type;

new_key_type! {
    /// Key for an intersection point.
    pub struct PointKey;

    /// Key for a parent side (element side or cut side).
    pub struct SideKey;

    /// Key for a facet (polygon bounding part of a volume cell).
    pub struct FacetKey;

    /// Key for a volume cell (connected piece of a cut element).
    pub struct VolumeCellKey;

    /// Key for a boundary integration cell.
    pub struct BoundaryCellKey;
}
