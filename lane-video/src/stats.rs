//! Lane-detection counters
//!
//! Mutated only by the analyze stage; readable from any thread without
//! locking (atomic loads, teacher-style relaxed stats).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Running counters for the analysis stage.
pub struct LaneState {
    frames_processed: AtomicU64,
    lines_detected: AtomicU64,
    latency_min_us: AtomicU64,
    latency_max_us: AtomicU64,
    latency_total_us: AtomicU64,
}

impl LaneState {
    pub fn new() -> Self {
        Self {
            frames_processed: AtomicU64::new(0),
            lines_detected: AtomicU64::new(0),
            latency_min_us: AtomicU64::new(u64::MAX),
            latency_max_us: AtomicU64::new(0),
            latency_total_us: AtomicU64::new(0),
        }
    }

    /// Record one analyzed frame: how many lane lines were found and how
    /// long the analysis took.
    pub fn record_frame(&self, lines_found: u64, latency: Duration) {
        let us = latency.as_micros() as u64;

        self.frames_processed.fetch_add(1, Ordering::Relaxed);
        self.lines_detected.fetch_add(lines_found, Ordering::Relaxed);
        self.latency_min_us.fetch_min(us, Ordering::Relaxed);
        self.latency_max_us.fetch_max(us, Ordering::Relaxed);
        self.latency_total_us.fetch_add(us, Ordering::Relaxed);
    }

    /// Consistent-enough point-in-time view for reporting.
    pub fn snapshot(&self) -> LaneStateSnapshot {
        let frames = self.frames_processed.load(Ordering::Relaxed);
        let total_us = self.latency_total_us.load(Ordering::Relaxed);
        let min_us = self.latency_min_us.load(Ordering::Relaxed);

        LaneStateSnapshot {
            frames_processed: frames,
            lines_detected: self.lines_detected.load(Ordering::Relaxed),
            latency_min_us: if min_us == u64::MAX { 0 } else { min_us },
            latency_max_us: self.latency_max_us.load(Ordering::Relaxed),
            latency_avg_us: if frames > 0 { total_us / frames } else { 0 },
        }
    }
}

impl Default for LaneState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LaneStateSnapshot {
    pub frames_processed: u64,
    pub lines_detected: u64,
    pub latency_min_us: u64,
    pub latency_max_us: u64,
    pub latency_avg_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let state = LaneState::new();
        let snap = state.snapshot();

        assert_eq!(snap.frames_processed, 0);
        assert_eq!(snap.latency_min_us, 0);
        assert_eq!(snap.latency_avg_us, 0);
    }

    #[test]
    fn test_latency_accumulation() {
        let state = LaneState::new();

        state.record_frame(2, Duration::from_micros(100));
        state.record_frame(0, Duration::from_micros(300));
        state.record_frame(1, Duration::from_micros(200));

        let snap = state.snapshot();
        assert_eq!(snap.frames_processed, 3);
        assert_eq!(snap.lines_detected, 3);
        assert_eq!(snap.latency_min_us, 100);
        assert_eq!(snap.latency_max_us, 300);
        assert_eq!(snap.latency_avg_us, 200);
    }
}
