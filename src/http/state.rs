use crate::config::Config;
use crate::media::{
    CommandTranscriber, FfmpegExtractor, LibreTranslateClient, PassthroughTranslator, Translator,
};
use crate::pipeline::MediaPipeline;
use crate::upload::{ChunkStore, Reassembler, UploadTracker};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state for HTTP handlers. Owns the session registry;
/// nothing here is process-wide.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ChunkStore>,
    pub tracker: Arc<UploadTracker>,
    pub reassembler: Arc<Reassembler>,
    pub pipeline: Arc<MediaPipeline>,
    pub pipeline_deadline: Option<Duration>,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let store = Arc::new(ChunkStore::new(&cfg.upload.work_dir)?);
        let tracker = Arc::new(UploadTracker::new(Arc::clone(&store)));
        let reassembler = Arc::new(Reassembler::new(Arc::clone(&store), Arc::clone(&tracker)));

        let translator: Arc<dyn Translator> = match cfg.media.translator.as_str() {
            "libretranslate" => Arc::new(LibreTranslateClient::new(&cfg.media.translate_url)),
            "passthrough" => Arc::new(PassthroughTranslator),
            other => anyhow::bail!("unknown translator backend {other:?}"),
        };

        let pipeline = Arc::new(MediaPipeline::new(
            Arc::new(FfmpegExtractor::new(&cfg.media.ffmpeg_path)),
            Arc::new(CommandTranscriber::new(cfg.media.transcriber_command.clone())),
            translator,
            &cfg.media.source_lang,
            &cfg.media.target_lang,
        ));

        Ok(Self {
            store,
            tracker,
            reassembler,
            pipeline,
            pipeline_deadline: cfg.media.pipeline_timeout_secs.map(Duration::from_secs),
        })
    }
}
