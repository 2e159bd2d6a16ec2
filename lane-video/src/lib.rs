//! Lane Pipeline - frame primitives
//!
//! Leaf crate shared by the detection and orchestration layers.
//!
//! Key pieces:
//! - Lock-free SPSC bounded channel for inter-stage frame hand-off
//! - Owned grayscale frame buffer with monotonic sequence numbers
//! - Atomic lane-detection counters readable from any thread

pub mod spsc;
pub mod stats;
pub mod types;

pub use spsc::*;
pub use stats::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_geometry() {
        let frame = Frame::new(640, 480, 0);
        assert_eq!(frame.data.len(), 640 * 480);

        let roi = Roi::new(100, 200, 300, 100);
        assert!(roi.fits_within(640, 480));
        assert!(!roi.fits_within(380, 480));
    }
}
