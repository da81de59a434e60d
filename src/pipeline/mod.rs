//! Sequential media processing for reassembled uploads.

mod runner;

pub use runner::{MediaPipeline, PipelineResult};
