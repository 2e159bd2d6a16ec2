//! Frame sinks
//!
//! Persistence adapters for analyzed frames. The disk sink writes one
//! grayscale PNG per frame with an 8-digit zero-padded counter that is
//! independent of the capture sequence number; the memory sink collects
//! frames for tests and can simulate a slow persist stage.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::controller::AnalyzedFrame;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot prepare output directory {path}: {source}")]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot encode frame {seq}")]
    Encode { seq: u64 },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Persistence adapter contract. Driven by exactly one pipeline thread.
pub trait FrameSink: Send {
    fn write(&mut self, frame: &AnalyzedFrame) -> Result<(), SinkError>;
}

/// Writes each frame as `<output_dir>/NNNNNNNN.png`.
///
/// The counter advances only on successful writes, so filenames stay
/// contiguous; the pipeline never drops frames to create gaps.
pub struct ImageDirSink {
    dir: PathBuf,
    next_index: u64,
}

impl ImageDirSink {
    pub fn new(dir: PathBuf) -> Result<Self, SinkError> {
        std::fs::create_dir_all(&dir).map_err(|source| SinkError::Prepare {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, next_index: 0 })
    }

    pub fn frames_written(&self) -> u64 {
        self.next_index
    }
}

impl FrameSink for ImageDirSink {
    fn write(&mut self, analyzed: &AnalyzedFrame) -> Result<(), SinkError> {
        let frame = &analyzed.frame;

        let img = image::GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or(SinkError::Encode { seq: frame.seq })?;

        let path = self.dir.join(format!("{:08}.png", self.next_index));
        img.save(&path).map_err(|source| SinkError::Write {
            path: path.clone(),
            source,
        })?;

        self.next_index += 1;
        Ok(())
    }
}

/// Collects analyzed frames in memory; optional per-write delay simulates
/// a slow persistence stage for backpressure tests.
pub struct MemorySink {
    frames: Arc<Mutex<Vec<AnalyzedFrame>>>,
    delay: Option<Duration>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            frames: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    /// Shared handle to the collected frames.
    pub fn frames(&self) -> Arc<Mutex<Vec<AnalyzedFrame>>> {
        self.frames.clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for MemorySink {
    fn write(&mut self, frame: &AnalyzedFrame) -> Result<(), SinkError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.frames.lock().push(frame.clone());
        Ok(())
    }
}
