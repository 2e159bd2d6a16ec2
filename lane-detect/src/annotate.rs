//! Frame annotation: lane-offset estimation and segment painting
//!
//! The offset estimator compares the midpoint of the two bottom-boundary
//! intersection points against the expected lane center and bands the
//! result using the measured lane width as the normalizing scale, so the
//! thresholds track however wide the lane appears in the current frame.

use lane_video::Frame;

use crate::analyzer::DetectionResult;
use crate::geometry::Segment;

/// Stability band for the signed lane offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetBand {
    Stable,
    Caution,
    Warning,
}

/// Signed lane-offset measurement for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneOffset {
    /// Lane width measured between the bottom-boundary intersections.
    pub width: f64,
    /// Midpoint of the lane at the bottom boundary, raw-frame x.
    pub midpoint: f64,
    /// Midpoint minus the expected center; positive means drifted right.
    pub offset: f64,
    pub band: OffsetBand,
}

/// Estimate the lane offset from a detection with both sides found.
///
/// Returns `None` when either side is missing: no offset or band is
/// computed for that frame.
///
/// Band boundaries are strict: an offset of exactly `width / 4` is
/// Caution and exactly `width / 6` is Stable.
pub fn estimate_offset(result: &DetectionResult, expected_center: f64) -> Option<LaneOffset> {
    let left = result.left?;
    let right = result.right?;

    let width = (right.bottom.x - left.bottom.x).abs();
    let midpoint = (right.bottom.x + left.bottom.x) / 2.0;
    let offset = midpoint - expected_center;

    let magnitude = offset.abs();
    let band = if magnitude > width / 4.0 {
        OffsetBand::Warning
    } else if magnitude > width / 6.0 {
        OffsetBand::Caution
    } else {
        OffsetBand::Stable
    };

    Some(LaneOffset {
        width,
        midpoint,
        offset,
        band,
    })
}

/// Paint a resolved segment into the frame's pixel buffer.
///
/// Simple fixed-step line walk; out-of-frame samples are clipped by the
/// bounds-checked pixel write.
pub fn paint_segment(frame: &mut Frame, segment: &Segment, value: u8) {
    let dx = segment.bottom.x - segment.top.x;
    let dy = segment.bottom.y - segment.top.y;
    // A segment can only cross width + height pixels of the frame; capping
    // the walk there keeps far-out degenerate endpoints cheap.
    let steps = (dx.abs().max(dy.abs()).ceil() as u32).min(frame.width + frame.height);
    if steps == 0 {
        return;
    }

    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = segment.top.x + dx * t;
        let y = segment.top.y + dy * t;
        if x >= 0.0 && y >= 0.0 {
            frame.set_pixel(x.round() as u32, y.round() as u32, value);
        }
    }
}
