// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerances and policy switches for a cutting session.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options controlling planarity tests, boundary cell generation and
/// position diagnostics.
///
/// Missing fields fall back to their defaults when deserialized, so a driver
/// can override a single tolerance:
///
/// ```
/// use cut_lite::CutOptions;
///
/// let options = CutOptions::from_json(r#"{ "gen_quad4": false }"#).unwrap();
/// assert!(!options.gen_quad4);
/// assert_eq!(options.planar_tol, CutOptions::default().planar_tol);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutOptions {
    /// Maximum out-of-plane distance of a facet point, and minimum cross
    /// product norm for two directions to count as non-collinear.
    pub planar_tol: f64,
    /// Determinant below which the local frame system counts as singular.
    pub linsolve_tol: f64,
    /// Emit quad4 boundary cells; otherwise quads are split into two tri3.
    pub gen_quad4: bool,
    /// Default tolerance for two-sided facet area checks.
    pub area_tol: f64,
    /// Fail instead of warn when a facet flips between inside and outside.
    pub strict_positions: bool,
    /// Drop intermediate collinear points from facet corner lists.
    pub detect_corners: bool,
}

impl Default for CutOptions {
    fn default() -> Self {
        Self {
            planar_tol: 1e-6,
            linsolve_tol: 1e-30,
            gen_quad4: true,
            area_tol: 1e-10,
            strict_positions: false,
            detect_corners: false,
        }
    }
}

impl CutOptions {
    /// Parses options from a (possibly partial) JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: CutOptions =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Checks that all tolerances are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("planar_tol", self.planar_tol),
            ("linsolve_tol", self.linsolve_tol),
            ("area_tol", self.area_tol),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!("{name} must be finite and >= 0, got {value}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CutOptions::default();
        assert_eq!(options.planar_tol, 1e-6);
        assert!(options.gen_quad4);
        assert!(!options.strict_positions);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let options = CutOptions::from_json(r#"{ "planar_tol": 1e-9, "strict_positions": true }"#)
            .unwrap();
        assert_eq!(options.planar_tol, 1e-9);
        assert!(options.strict_positions);
        assert_eq!(options.area_tol, 1e-10);
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let err = CutOptions::from_json(r#"{ "area_tol": -1.0 }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = CutOptions::from_json("{ planar_tol: }").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
