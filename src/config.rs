use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub upload: UploadConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Working directory for chunk blobs and reassembled files
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// ffmpeg binary used for audio extraction
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    /// External speech-to-text command; receives the WAV path as its
    /// last argument and prints the transcript on stdout
    pub transcriber_command: Vec<String>,

    /// Translation backend: "libretranslate" or "passthrough"
    #[serde(default = "default_translator")]
    pub translator: String,

    /// Endpoint for the libretranslate backend
    #[serde(default = "default_translate_url")]
    pub translate_url: String,

    /// Spoken language of the source audio
    #[serde(default = "default_source_lang")]
    pub source_lang: String,

    /// Target language for translation
    #[serde(default = "default_target_lang")]
    pub target_lang: String,

    /// Optional whole-pipeline deadline in seconds; expiry runs the same
    /// cleanup path as a stage failure
    pub pipeline_timeout_secs: Option<u64>,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_translator() -> String {
    "libretranslate".to_string()
}

fn default_translate_url() -> String {
    "https://libretranslate.de/translate".to_string()
}

fn default_source_lang() -> String {
    "ja".to_string()
}

fn default_target_lang() -> String {
    "fr".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
