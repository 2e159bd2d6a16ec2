//! laned - lane detection pipeline daemon
//!
//! Runs the capture -> analyze -> persist pipeline over the configured
//! source until the source is exhausted or an interrupt arrives, writing
//! one annotated PNG per processed frame.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use lane_pipeline::{
    build_synthetic_analyzer, open_source, ImageDirSink, PipelineConfig, PipelineController,
};
use lane_video::LaneState;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = PipelineConfig::load().context("loading configuration")?;
    log::info!(
        "laned starting: source={}, output={}, channel capacity={}",
        cfg.source,
        cfg.output_dir.display(),
        cfg.channel_capacity
    );
    log::info!("ROI {:?}, expected center {:.1}", cfg.roi, cfg.expected_center);

    let source = open_source(&cfg).context("opening frame source")?;
    let state = Arc::new(LaneState::new());
    let analyzer =
        build_synthetic_analyzer(&cfg, state.clone()).context("building frame analyzer")?;
    let sink = ImageDirSink::new(cfg.output_dir.clone()).context("preparing output directory")?;

    let controller =
        PipelineController::start(&cfg, source, analyzer, Box::new(sink), state)
            .context("starting pipeline")?;

    let running = controller.running_flag();
    ctrlc::set_handler(move || {
        log::info!("interrupt received, stopping pipeline");
        running.store(false, Ordering::Relaxed);
    })
    .context("installing interrupt handler")?;

    let report = controller.join().context("joining pipeline")?;

    log::info!(
        "pipeline done: captured={} analyzed={} persisted={} write_failures={}",
        report.frames_captured,
        report.frames_analyzed,
        report.frames_persisted,
        report.write_failures
    );
    log::info!(
        "lane state: frames={} lines={} latency min/avg/max = {}/{}/{} us",
        report.lane_state.frames_processed,
        report.lane_state.lines_detected,
        report.lane_state.latency_min_us,
        report.lane_state.latency_avg_us,
        report.lane_state.latency_max_us
    );

    Ok(())
}
