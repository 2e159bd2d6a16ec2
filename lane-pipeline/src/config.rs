//! Pipeline configuration
//!
//! Compiled-in defaults overlaid with an optional TOML file pointed to by
//! the `LANE_CONFIG` environment variable. The core never parses command
//! lines; everything it consumes arrives through this struct.

use std::path::{Path, PathBuf};

use lane_detect::{
    AngleWindow, ClassifierError, LineClassifier, DEFAULT_LEFT_WINDOW, DEFAULT_RIGHT_WINDOW,
};
use lane_video::Roi;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_SOURCE: &str = "synthetic://300";
const DEFAULT_OUTPUT_DIR: &str = "frames_out";
const DEFAULT_CHANNEL_CAPACITY: usize = 16;
const DEFAULT_FRAME_WIDTH: u32 = 1280;
const DEFAULT_FRAME_HEIGHT: u32 = 720;
const DEFAULT_ROI: Roi = Roi {
    x: 350,
    y: 430,
    width: 380,
    height: 140,
};
const DEFAULT_MAX_WRITE_FAILURES: u32 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("channel capacity must be at least 2, got {0}")]
    ChannelCapacityTooSmall(usize),
    #[error("ROI {roi:?} does not fit inside {width}x{height} frames")]
    RoiOutOfBounds { roi: Roi, width: u32, height: u32 },
    #[error("invalid classifier windows: {0}")]
    Classifier(#[from] ClassifierError),
}

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    source: Option<String>,
    output_dir: Option<PathBuf>,
    channel_capacity: Option<usize>,
    show_pipeline: Option<bool>,
    frame: Option<FrameConfigFile>,
    roi: Option<RoiConfigFile>,
    classifier: Option<ClassifierConfigFile>,
    lane: Option<LaneConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct FrameConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RoiConfigFile {
    x: Option<u32>,
    y: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    left: Option<WindowConfigFile>,
    right: Option<WindowConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct WindowConfigFile {
    lo: Option<f64>,
    hi: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct LaneConfigFile {
    expected_center: Option<f64>,
    max_write_failures: Option<u32>,
}

/// Resolved configuration consumed by the pipeline core.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input source identifier, e.g. `synthetic://300`.
    pub source: String,
    /// Directory receiving one image per processed frame.
    pub output_dir: PathBuf,
    /// Slots per inter-stage channel (holds capacity - 1 frames).
    pub channel_capacity: usize,
    /// Visualization toggle; affects only collaborator display calls.
    pub show_pipeline: bool,
    pub frame_width: u32,
    pub frame_height: u32,
    pub roi: Roi,
    /// Angular window classifying left-lane candidates, radians in [0, pi).
    pub left_window: AngleWindow,
    /// Angular window classifying right-lane candidates.
    pub right_window: AngleWindow,
    /// Expected lane center, raw-frame x at the ROI bottom boundary.
    pub expected_center: f64,
    /// Persist-stage failures tolerated before the pipeline aborts.
    pub max_write_failures: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            show_pipeline: false,
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            roi: DEFAULT_ROI,
            left_window: DEFAULT_LEFT_WINDOW,
            right_window: DEFAULT_RIGHT_WINDOW,
            expected_center: DEFAULT_ROI.center_x(),
            max_write_failures: DEFAULT_MAX_WRITE_FAILURES,
        }
    }
}

impl PipelineConfig {
    /// Load from the file named by `LANE_CONFIG`, falling back to defaults
    /// when the variable is unset.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("LANE_CONFIG") {
            Ok(path) => Self::load_from(Path::new(&path)),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Load defaults overlaid with one TOML file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: PipelineConfigFile =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut cfg = Self::default();

        if let Some(source) = file.source {
            cfg.source = source;
        }
        if let Some(dir) = file.output_dir {
            cfg.output_dir = dir;
        }
        if let Some(capacity) = file.channel_capacity {
            cfg.channel_capacity = capacity;
        }
        if let Some(show) = file.show_pipeline {
            cfg.show_pipeline = show;
        }
        if let Some(frame) = file.frame {
            cfg.frame_width = frame.width.unwrap_or(cfg.frame_width);
            cfg.frame_height = frame.height.unwrap_or(cfg.frame_height);
        }
        if let Some(roi) = file.roi {
            cfg.roi = Roi::new(
                roi.x.unwrap_or(cfg.roi.x),
                roi.y.unwrap_or(cfg.roi.y),
                roi.width.unwrap_or(cfg.roi.width),
                roi.height.unwrap_or(cfg.roi.height),
            );
            cfg.expected_center = cfg.roi.center_x();
        }
        if let Some(classifier) = file.classifier {
            if let Some(left) = classifier.left {
                cfg.left_window = AngleWindow::new(
                    left.lo.unwrap_or(cfg.left_window.lo),
                    left.hi.unwrap_or(cfg.left_window.hi),
                );
            }
            if let Some(right) = classifier.right {
                cfg.right_window = AngleWindow::new(
                    right.lo.unwrap_or(cfg.right_window.lo),
                    right.hi.unwrap_or(cfg.right_window.hi),
                );
            }
        }
        if let Some(lane) = file.lane {
            if let Some(center) = lane.expected_center {
                cfg.expected_center = center;
            }
            if let Some(max) = lane.max_write_failures {
                cfg.max_write_failures = max;
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity < 2 {
            return Err(ConfigError::ChannelCapacityTooSmall(self.channel_capacity));
        }
        if !self.roi.fits_within(self.frame_width, self.frame_height) {
            return Err(ConfigError::RoiOutOfBounds {
                roi: self.roi,
                width: self.frame_width,
                height: self.frame_height,
            });
        }
        // Rejects out-of-range and overlapping windows before any stage
        // spawns.
        LineClassifier::new(self.left_window, self.right_window)?;
        Ok(())
    }
}
