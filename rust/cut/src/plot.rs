// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Debug output for facets: a gnuplot data block and a compact one-line
//! listing.

use std::fmt;

use nalgebra::Point3;

use crate::error::Result;
use crate::keys::*;
use crate::session::CuttingSession;

/// Shrink factor toward the facet midpoint, so neighbouring facets stay
/// apart in the plot.
const SHRINK: f64 = 0.8;

/// Gnuplot data block of a facet and its holes.
///
/// Every row holds the shrunken coordinates, the true coordinates and the
/// point id as a comment. The loop is closed by repeating the first point and
/// each block ends with two blank lines.
pub struct FacetPlot<'a> {
    session: &'a CuttingSession,
    facet: FacetKey,
}

/// One-line listing: `facet: {0,1,2,}` or, for triangulated facets,
/// `facet: {{4,0,1,},{4,1,2,},}`. Holes follow the loop as nested listings.
pub struct FacetDisplay<'a> {
    session: &'a CuttingSession,
    facet: FacetKey,
}

impl CuttingSession {
    pub fn facet_plot(&self, facet: FacetKey) -> Result<FacetPlot<'_>> {
        self.facet_data(facet)?;
        Ok(FacetPlot {
            session: self,
            facet,
        })
    }

    pub fn facet_display(&self, facet: FacetKey) -> Result<FacetDisplay<'_>> {
        self.facet_data(facet)?;
        Ok(FacetDisplay {
            session: self,
            facet,
        })
    }
}

impl FacetPlot<'_> {
    fn write_block(&self, f: &mut fmt::Formatter<'_>, facet: FacetKey) -> fmt::Result {
        let data = self.session.facet(facet).ok_or(fmt::Error)?;
        let points = &data.points;

        write!(f, "# Facet: numpoints {}\n# ", points.len())?;
        for &p in points {
            write!(f, "{} ", point_id(self.session, p)?)?;
        }
        writeln!(f)?;
        if points.is_empty() {
            return Ok(());
        }

        let coords: Vec<Point3<f64>> = points
            .iter()
            .map(|&p| self.session.point(p).map(|d| d.x).ok_or(fmt::Error))
            .collect::<std::result::Result<_, _>>()?;
        let middle = coords
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, x| acc + x.coords)
            / coords.len() as f64;

        for i in 0..=points.len() {
            let x = coords[i % coords.len()];
            let shrunk = (x.coords - middle) * SHRINK + middle;
            writeln!(
                f,
                "{:.10} {:.10} {:.10} {:.10} {:.10} {:.10} # {}",
                shrunk.x,
                shrunk.y,
                shrunk.z,
                x.x,
                x.y,
                x.z,
                point_id(self.session, points[i % points.len()])?
            )?;
        }
        write!(f, "\n\n")?;

        for &hole in &data.holes {
            self.write_block(f, hole)?;
        }
        Ok(())
    }
}

impl fmt::Display for FacetPlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_block(f, self.facet)
    }
}

impl FacetDisplay<'_> {
    fn write_listing(&self, f: &mut fmt::Formatter<'_>, facet: FacetKey) -> fmt::Result {
        let data = self.session.facet(facet).ok_or(fmt::Error)?;
        write!(f, "facet: {{")?;
        if data.is_triangulated() {
            for tri in &data.triangulation {
                write!(f, "{{")?;
                for &p in tri {
                    write!(f, "{},", point_id(self.session, p)?)?;
                }
                write!(f, "}},")?;
            }
        } else {
            for &p in &data.points {
                write!(f, "{},", point_id(self.session, p)?)?;
            }
            for &hole in &data.holes {
                self.write_listing(f, hole)?;
            }
        }
        write!(f, "}}")
    }
}

impl fmt::Display for FacetDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_listing(f, self.facet)
    }
}

fn point_id(session: &CuttingSession, p: PointKey) -> std::result::Result<u32, fmt::Error> {
    session.point(p).map(|d| d.id).ok_or(fmt::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(session: &mut CuttingSession) -> FacetKey {
        let side = session.add_side(0);
        let p = vec![
            session.add_point(0.0, 0.0, 0.0),
            session.add_point(3.0, 0.0, 0.0),
            session.add_point(0.0, 3.0, 0.0),
        ];
        session.add_facet(p, side, false).unwrap()
    }

    #[test]
    fn listing_of_plain_facet() {
        let mut session = CuttingSession::new();
        let facet = triangle(&mut session);
        let text = session.facet_display(facet).unwrap().to_string();
        assert_eq!(text, "facet: {0,1,2,}");
    }

    #[test]
    fn listing_of_triangulated_facet() {
        let mut session = CuttingSession::new();
        let side = session.add_side(0);
        let p = vec![
            session.add_point(0.0, 0.0, 0.0),
            session.add_point(1.0, 0.0, 0.0),
            session.add_point(1.0, 1.0, 0.0),
            session.add_point(0.0, 1.0, 0.0),
        ];
        let facet = session.add_facet(p.clone(), side, false).unwrap();
        session.create_triangulation(facet, &p).unwrap();

        let text = session.facet_display(facet).unwrap().to_string();
        assert_eq!(text, "facet: {{4,0,1,},{4,1,2,},{4,2,3,},{4,3,0,},}");
    }

    #[test]
    fn plot_shrinks_toward_midpoint() {
        let mut session = CuttingSession::new();
        let facet = triangle(&mut session);
        let text = session.facet_plot(facet).unwrap().to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# Facet: numpoints 3");
        assert_eq!(lines[1], "# 0 1 2 ");
        // midpoint (1, 1, 0): (0, 0, 0) moves to (0.2, 0.2, 0)
        assert!(lines[2].starts_with("0.2000000000 0.2000000000 0.0000000000 0.0000000000"));
        assert!(lines[2].ends_with("# 0"));
        // closed loop: first point repeated
        assert!(lines[5].ends_with("# 0"));
        assert!(text.ends_with("\n\n\n"));
    }
}
