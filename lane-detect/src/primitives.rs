//! Seams for the external image-analysis primitives
//!
//! Edge-map extraction and line extraction are collaborators, not part of
//! this crate's logic: the analyzer only consumes their outputs. The traits
//! below define the boundary; the built-in implementations are deliberately
//! naive (a fixed-threshold crop and a static candidate list) and exist to
//! exercise the seams in tests and the synthetic demo.

use lane_video::{Frame, Roi};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrimitiveError {
    #[error("ROI {roi:?} does not fit inside a {width}x{height} frame")]
    RoiOutOfBounds { roi: Roi, width: u32, height: u32 },
    #[error("primitive failed: {0}")]
    Failed(String),
}

/// Binary candidate map over the ROI, in ROI-local coordinates.
#[derive(Debug, Clone)]
pub struct CandidateMap {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Raw line hypothesis in ROI-local coordinates, not yet classified.
///
/// Ephemeral: never retained past the frame that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineCandidate {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    /// Accumulator votes from the extraction primitive; used as the
    /// deterministic ranking for classification.
    pub votes: u32,
}

impl LineCandidate {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, votes: u32) -> Self {
        Self { x1, y1, x2, y2, votes }
    }
}

/// Produces a binary candidate map over the ROI of a frame.
pub trait EdgeExtractor: Send {
    fn extract(&mut self, frame: &Frame, roi: &Roi) -> Result<CandidateMap, PrimitiveError>;
}

/// Produces ranked line candidates over a candidate map.
pub trait LineExtractor: Send {
    fn extract(&mut self, map: &CandidateMap) -> Result<Vec<LineCandidate>, PrimitiveError>;
}

/// Crop-and-binarize edge stand-in: marks every ROI pixel at or above a
/// fixed threshold.
pub struct ThresholdEdgeExtractor {
    threshold: u8,
}

impl ThresholdEdgeExtractor {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }
}

impl EdgeExtractor for ThresholdEdgeExtractor {
    fn extract(&mut self, frame: &Frame, roi: &Roi) -> Result<CandidateMap, PrimitiveError> {
        if !roi.fits_within(frame.width, frame.height) {
            return Err(PrimitiveError::RoiOutOfBounds {
                roi: *roi,
                width: frame.width,
                height: frame.height,
            });
        }

        let mut data = Vec::with_capacity((roi.width * roi.height) as usize);
        for y in roi.y..roi.y + roi.height {
            for x in roi.x..roi.x + roi.width {
                let px = frame.data[(y * frame.width + x) as usize];
                data.push(if px >= self.threshold { 255 } else { 0 });
            }
        }

        Ok(CandidateMap {
            data,
            width: roi.width,
            height: roi.height,
        })
    }
}

/// Returns a preconfigured candidate list regardless of input.
///
/// Stub primitive for tests and the synthetic demo, where the candidate
/// geometry is known ahead of time.
pub struct StaticLineExtractor {
    candidates: Vec<LineCandidate>,
}

impl StaticLineExtractor {
    pub fn new(candidates: Vec<LineCandidate>) -> Self {
        Self { candidates }
    }

    /// Extractor that never finds anything.
    pub fn empty() -> Self {
        Self { candidates: Vec::new() }
    }
}

impl LineExtractor for StaticLineExtractor {
    fn extract(&mut self, _map: &CandidateMap) -> Result<Vec<LineCandidate>, PrimitiveError> {
        Ok(self.candidates.clone())
    }
}
