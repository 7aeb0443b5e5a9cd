use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loqa_recorder::audio::file::DEFAULT_BYTES_PER_SLICE;
use loqa_recorder::audio::format::mime_for_path;
use loqa_recorder::audio::{AudioArtifact, AudioSink, CaptureBackendFactory, CaptureSource, HeadlessSink};
use loqa_recorder::{create_router, AppState, Config, NatsUploader, Recorder, Transcoder};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loqa-recorder")]
#[command(version)]
#[command(about = "Two-channel audio recorder with MP3 transcoding and NATS upload")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API
    Serve {
        /// Config file (extension optional)
        #[arg(short, long, value_name = "PATH", default_value = "config/loqa-recorder")]
        config: String,
    },

    /// Transcode an audio file to MP3
    Transcode {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Target bitrate in kbps
        #[arg(short, long, default_value_t = loqa_recorder::transcode::DEFAULT_BITRATE_KBPS)]
        bitrate: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config } => serve(&config).await,
        Command::Transcode {
            input,
            output,
            bitrate,
        } => transcode(input, output, bitrate).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let cfg = Config::load(config_path)?;
    info!("Loaded config: {}", cfg.service.name);

    let source = cfg.capture.source();
    let backend = CaptureBackendFactory::create(&source, DEFAULT_BYTES_PER_SLICE)?;
    let sink = playback_sink(&source);
    info!("Capture backend: {}", backend.name());

    let recorder = Arc::new(Recorder::with_transcoder(
        backend,
        sink,
        cfg.capture.settings(),
        Transcoder::lame(cfg.transcode.bitrate_kbps),
    ));

    let uploader = NatsUploader::connect(&cfg.upload.nats_url, &cfg.upload.subject_prefix, &cfg.upload.user_id)
        .await?;

    let state = AppState::new(Arc::clone(&recorder), Arc::new(uploader), cfg.transcode.convert_to_mp3);
    let app = create_router(state).layer(CorsLayer::permissive());

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    recorder.shutdown().await;
    Ok(())
}

#[cfg(feature = "microphone")]
fn playback_sink(source: &CaptureSource) -> Arc<dyn AudioSink> {
    match source {
        CaptureSource::Microphone => Arc::new(loqa_recorder::audio::SpeakerSink::new()),
        CaptureSource::File(_) => Arc::new(HeadlessSink::new()),
    }
}

#[cfg(not(feature = "microphone"))]
fn playback_sink(_source: &CaptureSource) -> Arc<dyn AudioSink> {
    Arc::new(HeadlessSink::new())
}

async fn transcode(input: PathBuf, output: PathBuf, bitrate: u32) -> Result<()> {
    let payload = tokio::fs::read(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let artifact = AudioArtifact::new(payload, mime_for_path(&input));

    let mp3 = Transcoder::lame(bitrate)
        .encode(&artifact)
        .await
        .with_context(|| format!("Failed to transcode {}", input.display()))?;

    tokio::fs::write(&output, mp3.payload())
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        "Wrote {} ({} bytes, {} kbps)",
        output.display(),
        mp3.len(),
        bitrate
    );
    Ok(())
}
