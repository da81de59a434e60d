use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

/// Adapter boundary for turning a video container into mono 16kHz PCM WAV.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Extract the audio track of `input`. Success means the process
    /// exited zero and the output file exists.
    async fn extract(&self, input: &Path) -> ServiceResult<PathBuf>;
}

/// Shells out to ffmpeg. The transcription engines downstream expect
/// single-channel 16kHz uncompressed PCM, so the extraction normalizes
/// unconditionally.
pub struct FfmpegExtractor {
    ffmpeg_path: String,
}

impl FfmpegExtractor {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

/// The audio artifact sits next to its video with a `.wav` extension, so
/// cleanup can find it without threading the path around.
pub fn audio_path_for(video: &Path) -> PathBuf {
    video.with_extension("wav")
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, input: &Path) -> ServiceResult<PathBuf> {
        let output_path = audio_path_for(input);

        info!(
            "extracting audio: {} -> {}",
            input.display(),
            output_path.display()
        );

        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-ar", "16000", "-ac", "1", "-f", "wav"])
            .arg(&output_path)
            .output()
            .await
            .map_err(|e| {
                ServiceError::ExtractionFailed(format!(
                    "failed to spawn {}: {e}",
                    self.ffmpeg_path
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr.lines().last().unwrap_or("").trim().to_string();
            return Err(ServiceError::ExtractionFailed(format!(
                "{} exited with {}{}",
                self.ffmpeg_path,
                output.status,
                if tail.is_empty() {
                    String::new()
                } else {
                    format!(": {tail}")
                }
            )));
        }

        if !output_path.exists() {
            return Err(ServiceError::ExtractionFailed(format!(
                "{} reported success but produced no output at {}",
                self.ffmpeg_path,
                output_path.display()
            )));
        }

        Ok(output_path)
    }
}
