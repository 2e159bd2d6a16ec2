//! Frame sources
//!
//! Thin adapters in front of external capture. The pipeline only relies on
//! the `FrameSource` contract: frames arrive one at a time, `Ok(None)`
//! signals normal exhaustion, and calls return in bounded time.

use std::sync::Arc;

use glam::DVec2;
use lane_detect::{
    paint_segment, AnalyzerError, FrameAnalyzer, LineCandidate, LineClassifier, Segment,
    StaticLineExtractor, ThresholdEdgeExtractor,
};
use lane_video::{Frame, LaneState, Roi};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::config::PipelineConfig;

/// Binarization threshold used with the synthetic source; sits between the
/// road gradient and the painted lane lines.
const SYNTHETIC_EDGE_THRESHOLD: u8 = 200;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open source '{0}'")]
    Open(String),
    #[error("capture failed: {0}")]
    Capture(String),
}

/// Capture adapter contract.
///
/// Exactly one pipeline thread drives a source; implementations need
/// `Send` but never concurrent access.
pub trait FrameSource: Send {
    /// Produce the next frame, `Ok(None)` on end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Build the source named by the config's source identifier.
///
/// `synthetic://<count>` produces that many procedural frames;
/// `synthetic://` runs until cancelled. Anything else fails to open and
/// the pipeline never starts.
pub fn open_source(cfg: &PipelineConfig) -> Result<Box<dyn FrameSource>, SourceError> {
    match cfg.source.strip_prefix("synthetic://") {
        Some("") => Ok(Box::new(SyntheticSource::endless(
            cfg.frame_width,
            cfg.frame_height,
            cfg.roi,
        ))),
        Some(count) => {
            let count: u64 = count
                .parse()
                .map_err(|_| SourceError::Open(cfg.source.clone()))?;
            Ok(Box::new(SyntheticSource::new(
                cfg.frame_width,
                cfg.frame_height,
                cfg.roi,
                count,
            )))
        }
        None => Err(SourceError::Open(cfg.source.clone())),
    }
}

/// Analyzer wired for the synthetic demo: threshold edge extraction plus
/// a static line primitive matching the painted lane geometry.
pub fn build_synthetic_analyzer(
    cfg: &PipelineConfig,
    state: Arc<LaneState>,
) -> Result<FrameAnalyzer, AnalyzerError> {
    let classifier = LineClassifier::new(cfg.left_window, cfg.right_window)?;
    FrameAnalyzer::new(
        cfg.roi,
        cfg.frame_width,
        cfg.frame_height,
        Box::new(ThresholdEdgeExtractor::new(SYNTHETIC_EDGE_THRESHOLD)),
        Box::new(StaticLineExtractor::new(SyntheticSource::lane_candidates(
            &cfg.roi,
        ))),
        classifier,
        state,
    )
}

/// Procedural road-like frames: vertical luminance gradient, two lane
/// lines converging toward the ROI top, and a sprinkle of sensor noise.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    roi: Roi,
    remaining: Option<u64>,
    seq: u64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, roi: Roi, frames: u64) -> Self {
        Self {
            width,
            height,
            roi,
            remaining: Some(frames),
            seq: 0,
            rng: StdRng::seed_from_u64(0x1a5e),
        }
    }

    pub fn endless(width: u32, height: u32, roi: Roi) -> Self {
        Self {
            remaining: None,
            ..Self::new(width, height, roi, 0)
        }
    }

    /// The ROI-local candidates matching the painted lane geometry, ranked
    /// as an extraction primitive would rank them. Feeds the static line
    /// extractor in the synthetic demo.
    pub fn lane_candidates(roi: &Roi) -> Vec<LineCandidate> {
        let w = roi.width as f64;
        let h = roi.height as f64;
        vec![
            LineCandidate::new(0.40 * w, 0.0, 0.15 * w, h, 120),
            LineCandidate::new(0.60 * w, 0.0, 0.85 * w, h, 110),
        ]
    }

    fn render(&mut self) -> Frame {
        let mut frame = Frame::new(self.width, self.height, self.seq);

        // Road-like vertical gradient: darker sky, brighter asphalt.
        for y in 0..self.height {
            let shade = 40 + ((y * 100) / self.height.max(1)) as u8;
            let row = (y * self.width) as usize;
            frame.data[row..row + self.width as usize].fill(shade);
        }

        // Lane lines through the ROI, in raw-frame coordinates.
        let origin = DVec2::new(self.roi.x as f64, self.roi.y as f64);
        for candidate in Self::lane_candidates(&self.roi) {
            let segment = Segment {
                top: DVec2::new(candidate.x1, candidate.y1) + origin,
                bottom: DVec2::new(candidate.x2, candidate.y2) + origin,
            };
            paint_segment(&mut frame, &segment, 255);
        }

        // Sparse sensor noise, ~1% of pixels.
        let samples = (self.width as usize * self.height as usize) / 100;
        for _ in 0..samples {
            let x = self.rng.gen_range(0..self.width);
            let y = self.rng.gen_range(0..self.height);
            let value = self.rng.gen_range(0..=255u8);
            frame.set_pixel(x, y, value);
        }

        frame
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }

        let frame = self.render();
        self.seq += 1;
        Ok(Some(frame))
    }
}
