//! Lane Pipeline - detection and decision logic
//!
//! Consumes frames and the line candidates produced by external
//! image-analysis primitives and turns them into per-frame lane decisions.
//!
//! Key pieces:
//! - Trait seams for the edge-map and line-extraction primitives
//! - Angular-window left/right classification of raw candidates
//! - Line/ROI-boundary intersection and raw-frame coordinate mapping
//! - Lane-offset estimation with width-normalized stability bands

pub mod analyzer;
pub mod annotate;
pub mod classifier;
pub mod geometry;
pub mod primitives;

pub use analyzer::*;
pub use annotate::*;
pub use classifier::*;
pub use geometry::*;
pub use primitives::*;
