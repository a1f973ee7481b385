//! inspo-curator - Inspiration curation service
//!
//! **Module Identity:**
//! - Name: inspo-curator
//! - Port: 5740 (configurable)
//!
//! Describes candidate audio clips with a hosted generative model, moderates
//! the descriptions, and serves the accepted prompts mixed with pre-vetted
//! popular ones over HTTP + SSE.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use inspo_common::events::EventBus;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inspo_curator::config::{build_media_source, resolve_gemini_api_key};
use inspo_curator::services::InspirationService;
use inspo_curator::AppState;

const CONFIG_FILE_NAME: &str = "inspo-curator.toml";

/// Command-line arguments for inspo-curator
#[derive(Parser, Debug)]
#[command(name = "inspo-curator")]
#[command(about = "Inspiration curation service")]
#[command(version)]
struct Args {
    /// Bootstrap TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "INSPO_PORT")]
    port: Option<u16>,

    /// Directory holding the candidate clips
    #[arg(short, long, env = "INSPO_MEDIA_DIR")]
    media_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = inspo_common::config::load_config(args.config.as_deref(), CONFIG_FILE_NAME)
        .context("Failed to load configuration")?;

    // RUST_LOG wins over the config file
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("inspo_curator={0},inspo_common={0},tower_http=info", config.logging.level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting inspo-curator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let media = build_media_source(&config, args.media_dir.as_deref())
        .context("Failed to initialize media source")?;

    let event_bus = EventBus::new(100);
    let service = Arc::new(InspirationService::from_config(&config, media, event_bus));
    info!(
        clips = service.pool().len(),
        target = config.pipeline.target_count,
        "Inspiration service initialized"
    );

    match resolve_gemini_api_key(&config) {
        Some((key, source)) => {
            if let Err(e) = service.set_api_key(&key, source).await {
                warn!("Configured Gemini API key rejected: {}", e);
            }
        }
        None => warn!("Inspirations will show popular prompts only until an API key is set"),
    }

    let app = inspo_curator::build_router(AppState::new(service));

    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", config.bind_address, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
