use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use vidscribe::{create_router, AppState, Config};

#[derive(Debug, Parser)]
#[command(name = "vidscribe", about = "Chunked video upload, transcription and translation service")]
struct Args {
    /// Config file (without extension), resolved by the config crate
    #[arg(long, default_value = "config/vidscribe")]
    config: String,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config))?;
    if let Some(bind) = args.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} starting", cfg.service.name);
    info!("working directory: {}", cfg.upload.work_dir.display());
    info!(
        "languages: {} -> {}, translator: {}",
        cfg.media.source_lang, cfg.media.target_lang, cfg.media.translator
    );

    let state = AppState::from_config(&cfg).context("failed to build application state")?;
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
