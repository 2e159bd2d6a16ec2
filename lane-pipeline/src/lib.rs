//! Lane Pipeline - orchestration
//!
//! Three-stage soft-real-time pipeline: capture -> analyze -> persist,
//! connected by lock-free SPSC bounded channels.
//!
//! Key pieces:
//! - Frame source/sink adapter traits plus synthetic and PNG-directory
//!   implementations
//! - Layered TOML-over-defaults configuration
//! - Pipeline controller owning the worker threads, the channels and the
//!   cooperative cancellation flag

pub mod config;
pub mod controller;
pub mod sink;
pub mod source;

pub use config::*;
pub use controller::*;
pub use sink::*;
pub use source::*;
