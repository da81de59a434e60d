//! Chunked upload intake: blob storage, session tracking, reassembly.

mod reassembler;
mod store;
mod tracker;

pub use reassembler::Reassembler;
pub use store::ChunkStore;
pub use tracker::{ChunkOutcome, CompletedUpload, UploadTracker};

pub(crate) use tracker::validate_session_id;
