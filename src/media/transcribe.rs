use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

/// Samples per frame fed to a streaming session (200ms at 16kHz).
const FRAME_SAMPLES: usize = 3200;

/// Speech-to-text adapter boundary.
///
/// Backends may be streamed (frame by frame, with interim results) or
/// batch-only; both conventions meet here. `transcribe_wav` is the batch
/// entry point and by default drives the streaming session, so a backend
/// implements whichever convention is natural and gets the other for free.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Open a recognition session for audio at the given sample rate.
    async fn session(&self, sample_rate: u32) -> ServiceResult<Box<dyn TranscriberSession>>;

    /// Transcribe a whole WAV file, accumulating interim and final results
    /// into one text. An empty result is legal (silent audio).
    async fn transcribe_wav(&self, path: &Path) -> ServiceResult<String> {
        let (sample_rate, samples) = read_wav(path).await?;
        let mut session = self.session(sample_rate).await?;

        let mut parts: Vec<String> = Vec::new();
        for frame in samples.chunks(FRAME_SAMPLES) {
            if let Some(interim) = session.feed(frame).await? {
                let interim = interim.trim();
                if !interim.is_empty() {
                    parts.push(interim.to_string());
                }
            }
        }

        let final_text = session.finalize().await?;
        let final_text = final_text.trim();
        if !final_text.is_empty() {
            parts.push(final_text.to_string());
        }

        debug!("transcribed {} segments from {}", parts.len(), path.display());
        Ok(parts.join(" "))
    }
}

/// One in-flight recognition: feed PCM frames, then flush.
#[async_trait]
pub trait TranscriberSession: Send {
    /// Feed one frame of mono i16 PCM. May yield an interim result.
    async fn feed(&mut self, samples: &[i16]) -> ServiceResult<Option<String>>;

    /// Flush remaining audio and return the final text.
    async fn finalize(self: Box<Self>) -> ServiceResult<String>;
}

/// Runs an external speech-to-text command (whisper-cli style): the WAV
/// path is appended as the last argument and the transcript is read from
/// stdout. The streaming convention buffers frames and recognizes once on
/// finalize.
pub struct CommandTranscriber {
    command: Vec<String>,
}

impl CommandTranscriber {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    async fn run(&self, wav_path: &Path) -> ServiceResult<String> {
        let program = self.command.first().ok_or_else(|| {
            ServiceError::TranscriptionFailed("transcriber command not configured".to_string())
        })?;

        info!("transcribing {} via {}", wav_path.display(), program);

        let output = tokio::process::Command::new(program)
            .args(&self.command[1..])
            .arg(wav_path)
            .output()
            .await
            .map_err(|e| {
                ServiceError::TranscriptionFailed(format!("failed to spawn {program}: {e}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr.lines().last().unwrap_or("").trim().to_string();
            return Err(ServiceError::TranscriptionFailed(format!(
                "{program} exited with {}{}",
                output.status,
                if tail.is_empty() {
                    String::new()
                } else {
                    format!(": {tail}")
                }
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl Transcriber for CommandTranscriber {
    async fn session(&self, sample_rate: u32) -> ServiceResult<Box<dyn TranscriberSession>> {
        Ok(Box::new(BufferedSession {
            command: self.command.clone(),
            sample_rate,
            samples: Vec::new(),
        }))
    }

    // Batch calls skip the decode/re-encode round trip.
    async fn transcribe_wav(&self, path: &Path) -> ServiceResult<String> {
        self.run(path).await
    }
}

struct BufferedSession {
    command: Vec<String>,
    sample_rate: u32,
    samples: Vec<i16>,
}

#[async_trait]
impl TranscriberSession for BufferedSession {
    async fn feed(&mut self, samples: &[i16]) -> ServiceResult<Option<String>> {
        self.samples.extend_from_slice(samples);
        Ok(None)
    }

    async fn finalize(self: Box<Self>) -> ServiceResult<String> {
        let wav_path = std::env::temp_dir().join(format!("vidscribe-{}.wav", uuid::Uuid::new_v4()));
        write_wav(&wav_path, self.sample_rate, self.samples).await?;

        let transcriber = CommandTranscriber::new(self.command);
        let result = transcriber.run(&wav_path).await;

        if let Err(e) = tokio::fs::remove_file(&wav_path).await {
            debug!("failed to remove scratch wav {}: {}", wav_path.display(), e);
        }

        result
    }
}

async fn read_wav(path: &Path) -> ServiceResult<(u32, Vec<i16>)> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> ServiceResult<(u32, Vec<i16>)> {
        let reader = hound::WavReader::open(&path).map_err(|e| {
            ServiceError::TranscriptionFailed(format!("open wav {}: {e}", path.display()))
        })?;
        let sample_rate = reader.spec().sample_rate;
        let samples = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                ServiceError::TranscriptionFailed(format!("read wav {}: {e}", path.display()))
            })?;
        Ok((sample_rate, samples))
    })
    .await
    .map_err(|e| ServiceError::TranscriptionFailed(format!("wav read task: {e}")))?
}

async fn write_wav(path: &Path, sample_rate: u32, samples: Vec<i16>) -> ServiceResult<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> ServiceResult<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).map_err(|e| {
            ServiceError::TranscriptionFailed(format!("create wav {}: {e}", path.display()))
        })?;
        for sample in samples {
            writer.write_sample(sample).map_err(|e| {
                ServiceError::TranscriptionFailed(format!("write wav sample: {e}"))
            })?;
        }
        writer
            .finalize()
            .map_err(|e| ServiceError::TranscriptionFailed(format!("finalize wav: {e}")))
    })
    .await
    .map_err(|e| ServiceError::TranscriptionFailed(format!("wav write task: {e}")))?
}
