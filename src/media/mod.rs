//! Adapters to the external transforms: audio extraction, speech-to-text,
//! and machine translation.

mod extract;
mod transcribe;
mod translate;

pub use extract::{audio_path_for, AudioExtractor, FfmpegExtractor};
pub use transcribe::{CommandTranscriber, Transcriber, TranscriberSession};
pub use translate::{LibreTranslateClient, PassthroughTranslator, Translator};
