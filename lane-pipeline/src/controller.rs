//! Pipeline controller
//!
//! Owns the three worker threads (capture, analyze, persist), the two SPSC
//! channels connecting them, and the shared cancellation flag. Cancellation
//! is cooperative: every stage checks the flag once per loop iteration and
//! the consumers drain their input channel before exiting, so no accepted
//! frame is lost on shutdown.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use lane_detect::{
    estimate_offset, paint_segment, DetectionResult, FrameAnalyzer, LaneOffset, OffsetBand,
};
use lane_video::{
    BoundedChannel, ChannelConsumer, ChannelProducer, Frame, LaneState, LaneStateSnapshot,
};
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::sink::FrameSink;
use crate::source::FrameSource;

/// Producer retry interval while the downstream channel is full.
const BACKPRESSURE_RETRY: Duration = Duration::from_millis(1);
/// Consumer poll interval while the upstream channel is empty.
const EMPTY_POLL: Duration = Duration::from_micros(100);

/// Pixel value painted over detected lane segments.
const SEGMENT_PAINT: u8 = 255;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot spawn {stage} thread: {source}")]
    Spawn {
        stage: &'static str,
        source: std::io::Error,
    },
    #[error("{stage} stage panicked")]
    StagePanicked { stage: &'static str },
}

/// Analyze-stage output: the annotated frame plus its detection and, when
/// both sides were found, the lane-offset measurement.
#[derive(Debug, Clone)]
pub struct AnalyzedFrame {
    pub frame: Frame,
    pub detection: DetectionResult,
    pub offset: Option<LaneOffset>,
}

/// Final accounting returned by [`PipelineController::join`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineReport {
    pub frames_captured: u64,
    pub frames_analyzed: u64,
    pub frames_persisted: u64,
    pub write_failures: u64,
    pub lane_state: LaneStateSnapshot,
}

#[derive(Default)]
struct PipelineCounters {
    captured: AtomicU64,
    analyzed: AtomicU64,
    persisted: AtomicU64,
    write_failures: AtomicU64,
}

/// Three-stage frame pipeline: capture -> analyze -> persist.
pub struct PipelineController {
    running: Arc<AtomicBool>,
    state: Arc<LaneState>,
    counters: Arc<PipelineCounters>,
    capture: Option<JoinHandle<()>>,
    analyze: Option<JoinHandle<()>>,
    persist: Option<JoinHandle<()>>,
}

impl PipelineController {
    /// Start all three stages. Channels are sized from the config; the
    /// returned controller owns the threads until [`join`](Self::join).
    pub fn start(
        cfg: &PipelineConfig,
        source: Box<dyn FrameSource>,
        analyzer: FrameAnalyzer,
        sink: Box<dyn FrameSink>,
        state: Arc<LaneState>,
    ) -> Result<Self, PipelineError> {
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(PipelineCounters::default());

        let (frame_tx, frame_rx) = BoundedChannel::with_capacity::<Frame>(cfg.channel_capacity);
        let (analyzed_tx, analyzed_rx) =
            BoundedChannel::with_capacity::<AnalyzedFrame>(cfg.channel_capacity);

        // Stage-exit flags let each consumer drain its input fully: a
        // consumer only stops once its producer has exited and the channel
        // is observed empty afterwards.
        let capture_done = Arc::new(AtomicBool::new(false));
        let analyze_done = Arc::new(AtomicBool::new(false));

        let capture = spawn_stage("lane-capture", {
            let running = running.clone();
            let counters = counters.clone();
            let done = capture_done.clone();
            move || {
                capture_stage(source, frame_tx, running, counters);
                done.store(true, Ordering::Release);
            }
        })?;

        let analyze = match spawn_stage("lane-analyze", {
            let running = running.clone();
            let counters = counters.clone();
            let expected_center = cfg.expected_center;
            let show_pipeline = cfg.show_pipeline;
            let done = analyze_done.clone();
            move || {
                analyze_stage(
                    analyzer,
                    frame_rx,
                    analyzed_tx,
                    running,
                    counters,
                    capture_done,
                    expected_center,
                    show_pipeline,
                );
                done.store(true, Ordering::Release);
            }
        }) {
            Ok(handle) => handle,
            Err(e) => return Err(abort_spawn(e, &running, vec![capture])),
        };

        let persist = match spawn_stage("lane-persist", {
            let running = running.clone();
            let counters = counters.clone();
            let max_write_failures = cfg.max_write_failures;
            move || {
                persist_stage(
                    sink,
                    analyzed_rx,
                    running,
                    counters,
                    analyze_done,
                    max_write_failures,
                )
            }
        }) {
            Ok(handle) => handle,
            Err(e) => return Err(abort_spawn(e, &running, vec![capture, analyze])),
        };

        Ok(Self {
            running,
            state,
            counters,
            capture: Some(capture),
            analyze: Some(analyze),
            persist: Some(persist),
        })
    }

    /// Shared cancellation flag; clearing it stops every stage. Written by
    /// the controller and the interrupt path, only read elsewhere.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Request cooperative shutdown.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Wait for all stages to exit and return the final accounting.
    pub fn join(mut self) -> Result<PipelineReport, PipelineError> {
        self.join_stages()?;

        Ok(PipelineReport {
            frames_captured: self.counters.captured.load(Ordering::Relaxed),
            frames_analyzed: self.counters.analyzed.load(Ordering::Relaxed),
            frames_persisted: self.counters.persisted.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
            lane_state: self.state.snapshot(),
        })
    }

    fn join_stages(&mut self) -> Result<(), PipelineError> {
        for (stage, handle) in [
            ("capture", self.capture.take()),
            ("analyze", self.analyze.take()),
            ("persist", self.persist.take()),
        ] {
            if let Some(handle) = handle {
                handle
                    .join()
                    .map_err(|_| PipelineError::StagePanicked { stage })?;
            }
        }
        Ok(())
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.request_stop();
        let _ = self.join_stages();
    }
}

/// Cleanup when a stage fails to spawn: clear the shared flag so the
/// stages already running exit, and reap them before surfacing the error.
fn abort_spawn(
    err: PipelineError,
    running: &AtomicBool,
    stages: Vec<JoinHandle<()>>,
) -> PipelineError {
    running.store(false, Ordering::Relaxed);
    for handle in stages {
        let _ = handle.join();
    }
    err
}

fn spawn_stage<F>(name: &'static str, body: F) -> Result<JoinHandle<()>, PipelineError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|source| PipelineError::Spawn {
            stage: name,
            source,
        })
}

/// Enqueue with bounded-latency backpressure: sleep-and-retry while the
/// channel is full, re-checking the cancellation flag every iteration so
/// a stalled consumer cannot hold up shutdown.
///
/// Returns false (dropping the value) when cancelled mid-retry.
fn put_with_backpressure<T: Send>(
    tx: &mut ChannelProducer<T>,
    mut value: T,
    running: &AtomicBool,
) -> bool {
    loop {
        match tx.try_put(value) {
            Ok(()) => return true,
            Err(v) => {
                if !running.load(Ordering::Relaxed) {
                    return false;
                }
                value = v;
                thread::sleep(BACKPRESSURE_RETRY);
            }
        }
    }
}

fn capture_stage(
    mut source: Box<dyn FrameSource>,
    mut tx: ChannelProducer<Frame>,
    running: Arc<AtomicBool>,
    counters: Arc<PipelineCounters>,
) {
    while running.load(Ordering::Relaxed) {
        match source.next_frame() {
            Ok(Some(frame)) => {
                if !put_with_backpressure(&mut tx, frame, &running) {
                    break;
                }
                counters.captured.fetch_add(1, Ordering::Relaxed);
            }
            Ok(None) => {
                log::info!("capture: source exhausted, stopping pipeline");
                running.store(false, Ordering::Relaxed);
                break;
            }
            Err(e) => {
                log::error!("capture: {e}, stopping pipeline");
                running.store(false, Ordering::Relaxed);
                break;
            }
        }
    }
    log::debug!("capture thread exiting");
}

fn analyze_stage(
    mut analyzer: FrameAnalyzer,
    mut rx: ChannelConsumer<Frame>,
    mut tx: ChannelProducer<AnalyzedFrame>,
    running: Arc<AtomicBool>,
    counters: Arc<PipelineCounters>,
    upstream_done: Arc<AtomicBool>,
    expected_center: f64,
    show_pipeline: bool,
) {
    let mut last_band: Option<OffsetBand> = None;

    loop {
        match rx.try_get() {
            Some(mut frame) => {
                let detection = match analyzer.analyze(&frame) {
                    Ok(detection) => detection,
                    Err(e) => {
                        log::error!("analyze: unrecoverable: {e}, stopping pipeline");
                        running.store(false, Ordering::Relaxed);
                        break;
                    }
                };

                let offset = estimate_offset(&detection, expected_center);
                if let Some(measure) = &offset {
                    if last_band != Some(measure.band) {
                        log::info!(
                            "frame {}: lane offset {:+.1}px (width {:.1}px) -> {:?}",
                            frame.seq,
                            measure.offset,
                            measure.width,
                            measure.band
                        );
                        last_band = Some(measure.band);
                    }
                }

                for segment in [detection.left, detection.right].into_iter().flatten() {
                    paint_segment(&mut frame, &segment, SEGMENT_PAINT);
                }

                if show_pipeline {
                    log::debug!(
                        "frame {}: left={} right={}",
                        frame.seq,
                        detection.left.is_some(),
                        detection.right.is_some()
                    );
                }

                let analyzed = AnalyzedFrame {
                    frame,
                    detection,
                    offset,
                };
                if !put_with_backpressure(&mut tx, analyzed, &running) {
                    break;
                }
                counters.analyzed.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                // The acquire load pairs with the producer's exit: once
                // observed, every frame it put is visible, so a second
                // empty check means the drain is complete.
                if upstream_done.load(Ordering::Acquire) && rx.is_empty() {
                    break;
                }
                thread::sleep(EMPTY_POLL);
            }
        }
    }
    log::debug!("analyze thread exiting");
}

fn persist_stage(
    mut sink: Box<dyn FrameSink>,
    mut rx: ChannelConsumer<AnalyzedFrame>,
    running: Arc<AtomicBool>,
    counters: Arc<PipelineCounters>,
    upstream_done: Arc<AtomicBool>,
    max_write_failures: u32,
) {
    let mut failures = 0u32;

    loop {
        match rx.try_get() {
            Some(analyzed) => match sink.write(&analyzed) {
                Ok(()) => {
                    counters.persisted.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    failures += 1;
                    counters.write_failures.fetch_add(1, Ordering::Relaxed);
                    log::warn!(
                        "persist: write failed ({failures}/{max_write_failures}): {e}"
                    );
                    if failures >= max_write_failures {
                        log::error!("persist: failure threshold reached, stopping pipeline");
                        running.store(false, Ordering::Relaxed);
                        break;
                    }
                }
            },
            None => {
                if upstream_done.load(Ordering::Acquire) && rx.is_empty() {
                    break;
                }
                thread::sleep(EMPTY_POLL);
            }
        }
    }
    log::debug!("persist thread exiting");
}
