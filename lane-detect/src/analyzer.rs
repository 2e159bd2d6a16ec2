//! Per-frame analysis orchestration
//!
//! Wires the external primitives, the classifier and the geometry resolver
//! into one `analyze` call per frame. Stateless across frames except for
//! the shared `LaneState` counters.

use std::sync::Arc;
use std::time::Instant;

use lane_video::{Frame, LaneState, Roi};
use thiserror::Error;

use crate::classifier::{ClassifierError, LineClassifier};
use crate::geometry::{GeometryResolver, Segment};
use crate::primitives::{EdgeExtractor, LineExtractor, PrimitiveError};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("ROI {roi:?} does not fit inside {width}x{height} frames")]
    RoiOutOfBounds { roi: Roi, width: u32, height: u32 },
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

/// Outcome of analyzing one frame.
///
/// A side is `Some` only when a candidate matched its angular window and
/// both ROI-boundary intersections succeeded; coordinates are in raw-frame
/// space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectionResult {
    pub left: Option<Segment>,
    pub right: Option<Segment>,
}

impl DetectionResult {
    pub fn both_found(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }
}

/// Turns frames into `DetectionResult`s.
pub struct FrameAnalyzer {
    roi: Roi,
    edges: Box<dyn EdgeExtractor>,
    lines: Box<dyn LineExtractor>,
    classifier: LineClassifier,
    resolver: GeometryResolver,
    state: Arc<LaneState>,
}

impl FrameAnalyzer {
    /// Build an analyzer for frames of the given size.
    ///
    /// ROI validity against the frame dimensions is checked here, once;
    /// `analyze` assumes it.
    pub fn new(
        roi: Roi,
        frame_width: u32,
        frame_height: u32,
        edges: Box<dyn EdgeExtractor>,
        lines: Box<dyn LineExtractor>,
        classifier: LineClassifier,
        state: Arc<LaneState>,
    ) -> Result<Self, AnalyzerError> {
        if !roi.fits_within(frame_width, frame_height) {
            return Err(AnalyzerError::RoiOutOfBounds {
                roi,
                width: frame_width,
                height: frame_height,
            });
        }

        Ok(Self {
            roi,
            edges,
            lines,
            classifier,
            resolver: GeometryResolver::new(roi),
            state,
        })
    }

    pub fn roi(&self) -> Roi {
        self.roi
    }

    /// Analyze one frame: extract candidates, classify left/right, resolve
    /// the ROI-boundary intersections, and update the running counters.
    ///
    /// Zero candidates is a normal outcome, not an error.
    pub fn analyze(&mut self, frame: &Frame) -> Result<DetectionResult, AnalyzerError> {
        let started = Instant::now();

        let map = self.edges.extract(frame, &self.roi)?;
        let mut candidates = self.lines.extract(&map)?;

        // Rank by votes so first-match-wins selection is deterministic
        // even when the primitive's own ordering is not.
        candidates.sort_by(|a, b| b.votes.cmp(&a.votes));
        log::trace!("frame {}: {} line candidates", frame.seq, candidates.len());

        let (left, right) = self.classifier.select(&candidates);
        let result = DetectionResult {
            left: left.and_then(|c| self.resolver.resolve(c)),
            right: right.and_then(|c| self.resolver.resolve(c)),
        };

        let lines_found = result.left.is_some() as u64 + result.right.is_some() as u64;
        self.state.record_frame(lines_found, started.elapsed());

        Ok(result)
    }
}
