//! Line/ROI-boundary geometry
//!
//! Resolves a classified candidate into a segment spanning the ROI: the
//! infinite line through the candidate's endpoints is intersected with the
//! ROI's top and bottom boundaries, then translated into raw-frame
//! coordinates.

use glam::DVec2;
use lane_video::Roi;

use crate::primitives::LineCandidate;

/// Cross products below this magnitude are treated as parallel lines.
const PARALLEL_EPS: f64 = 1e-8;

/// Two-point lane segment in raw-frame coordinates.
///
/// `top` lies on the ROI's top boundary, `bottom` on its bottom boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub top: DVec2,
    pub bottom: DVec2,
}

/// Intersection of the infinite lines through (o1, p1) and (o2, p2).
///
/// Returns `None` for parallel or near-parallel lines.
pub fn intersect(o1: DVec2, p1: DVec2, o2: DVec2, p2: DVec2) -> Option<DVec2> {
    let d1 = p1 - o1;
    let d2 = p2 - o2;

    let cross = d1.x * d2.y - d1.y * d2.x;
    if cross.abs() < PARALLEL_EPS {
        return None;
    }

    let x = o2 - o1;
    let t = (x.x * d2.y - x.y * d2.x) / cross;
    Some(o1 + d1 * t)
}

/// Maps ROI-local candidates onto the ROI boundaries in raw-frame
/// coordinates. The ROI is fixed at construction.
pub struct GeometryResolver {
    roi: Roi,
}

impl GeometryResolver {
    pub fn new(roi: Roi) -> Self {
        Self { roi }
    }

    /// Intersect the candidate's line with the ROI top and bottom
    /// boundaries. Both intersections must exist for the candidate to
    /// resolve; a line parallel to the boundaries yields `None`.
    pub fn resolve(&self, candidate: &LineCandidate) -> Option<Segment> {
        let o = DVec2::new(candidate.x1, candidate.y1);
        let p = DVec2::new(candidate.x2, candidate.y2);

        let w = self.roi.width as f64;
        let h = self.roi.height as f64;

        // ROI-local boundaries
        let top = intersect(o, p, DVec2::new(0.0, 0.0), DVec2::new(w, 0.0))?;
        let bottom = intersect(o, p, DVec2::new(0.0, h), DVec2::new(w, h))?;

        // Translate into raw-frame coordinates
        let origin = DVec2::new(self.roi.x as f64, self.roi.y as f64);
        Some(Segment {
            top: top + origin,
            bottom: bottom + origin,
        })
    }
}
