// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Position classification of points, facets and volume cells.

use serde::{Deserialize, Serialize};

/// Where an entity lies relative to the cut surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Not classified yet.
    #[default]
    Undecided,
    Inside,
    Outside,
    OnCutSurface,
}

impl Position {
    /// Returns `true` for inside and outside, the bulk classifications that
    /// spread to neighbouring entities.
    pub fn is_bulk(self) -> bool {
        matches!(self, Position::Inside | Position::Outside)
    }

    /// Returns `true` if `self` and `other` are opposite bulk classifications.
    pub fn conflicts_with(self, other: Position) -> bool {
        matches!(
            (self, other),
            (Position::Inside, Position::Outside) | (Position::Outside, Position::Inside)
        )
    }

    /// Reserved id used in place of a side id when no physical side exists.
    pub fn sentinel_id(self) -> i32 {
        match self {
            Position::OnCutSurface => 0,
            Position::Inside => -1,
            Position::Outside => -2,
            Position::Undecided => -3,
        }
    }

    /// Returns the position name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Undecided => "undecided",
            Position::Inside => "inside",
            Position::Outside => "outside",
            Position::OnCutSurface => "oncutsurface",
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
