use crate::error::{ServiceError, ServiceResult};
use crate::media::{audio_path_for, AudioExtractor, Transcriber, Translator};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Final output of a pipeline run. Returned once to the caller, never
/// persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub transcription: String,
    pub translation: String,
}

/// Drives one reassembled video through the sequential stages
/// extract → transcribe → translate, then deletes the video and audio
/// artifacts whether or not a stage failed.
///
/// No stage is retried and no stage is re-entered; an empty transcript is
/// a success (silent audio) and still flows through translation so the
/// stage sequence is uniform.
pub struct MediaPipeline {
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn Transcriber>,
    translator: Arc<dyn Translator>,
    source_lang: String,
    target_lang: String,
}

impl MediaPipeline {
    pub fn new(
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            transcriber,
            translator,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }

    /// Process one reassembled video. With a deadline, expiry aborts the
    /// stages but still runs cleanup before the error surfaces.
    pub async fn process(
        &self,
        video_path: &Path,
        deadline: Option<Duration>,
    ) -> ServiceResult<PipelineResult> {
        let outcome = match deadline {
            Some(limit) => match tokio::time::timeout(limit, self.run_stages(video_path)).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::DeadlineExceeded(limit)),
            },
            None => self.run_stages(video_path).await,
        };

        // Unconditional: the video and any extracted audio go away on
        // every exit path, including failures and deadline expiry.
        self.cleanup(video_path).await;

        match &outcome {
            Ok(result) => info!(
                "pipeline done for {} ({} chars transcribed)",
                video_path.display(),
                result.transcription.len()
            ),
            Err(e) => error!(
                "pipeline failed for {} at stage {}: {}",
                video_path.display(),
                e.stage().unwrap_or("pipeline"),
                e
            ),
        }

        outcome
    }

    async fn run_stages(&self, video_path: &Path) -> ServiceResult<PipelineResult> {
        let audio_path = self.extractor.extract(video_path).await?;

        let transcription = self.transcriber.transcribe_wav(&audio_path).await?;
        if transcription.is_empty() {
            info!("no speech recognized in {}", audio_path.display());
        }

        let translation = self
            .translator
            .translate(&transcription, &self.source_lang, &self.target_lang)
            .await?;

        Ok(PipelineResult {
            transcription,
            translation,
        })
    }

    async fn cleanup(&self, video_path: &Path) {
        // The audio artifact location is derived, not threaded through, so
        // cleanup works even when extraction was cut short.
        for path in [video_path.to_path_buf(), audio_path_for(video_path)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove artifact {}: {}", path.display(), e),
            }
        }
    }
}
