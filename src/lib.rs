pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod pipeline;
pub mod upload;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use http::{create_router, AppState};
pub use media::{
    audio_path_for, AudioExtractor, CommandTranscriber, FfmpegExtractor, LibreTranslateClient,
    PassthroughTranslator, Transcriber, TranscriberSession, Translator,
};
pub use pipeline::{MediaPipeline, PipelineResult};
pub use upload::{ChunkOutcome, ChunkStore, CompletedUpload, Reassembler, UploadTracker};
