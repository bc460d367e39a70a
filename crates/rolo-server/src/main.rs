//! rolo-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus `ROLO_*`
//! environment variables, opens the SQLite card store, and serves the card
//! API over HTTP.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use rolo_api::AppState;
use rolo_core::visibility::AccessPolicy;
use rolo_extract::{Gateway, GeminiTransport};
use rolo_server::{Extractor, Service, expand_tilde, load_config, sink::WebhookSink};
use rolo_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Rolo business-card server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = load_config(&cli.config).context("failed to load configuration")?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Extraction gateway.
  let transport = GeminiTransport::new(server_cfg.vision.clone())
    .context("failed to build vision client")?;
  let extractor: Extractor = Gateway::new(transport, server_cfg.retry.policy());

  // Export sink.
  let sink = server_cfg
    .export_webhook
    .as_deref()
    .map(WebhookSink::new)
    .transpose()
    .context("failed to build export webhook client")?;
  if sink.is_none() {
    tracing::info!("no export webhook configured; exports are disabled");
  }

  let policy = AccessPolicy::new(&server_cfg.privileged_submitter);
  let cards: Service = Service::with_sink(store, policy, sink);
  let app = rolo_server::app(AppState::new(cards, extractor));

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
