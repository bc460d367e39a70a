//! Rolo server wiring: configuration, the webhook export sink, and the
//! traced HTTP application.

pub mod sink;

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use axum::Router;
use rolo_api::{AppState, api_router};
use rolo_core::{
  export::ExportSink, extract::CardExtractor, lifecycle::CardService,
  store::CardStore,
};
use rolo_extract::{Gateway, GeminiConfig, GeminiTransport, RetryPolicy};
use rolo_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use sink::WebhookSink;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/rolo/rolo.db") }

/// Runtime server configuration, deserialised from `config.toml` layered with
/// `ROLO_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  /// Identity whose cards every user sees and whose new cards are exported.
  pub privileged_submitter: String,
  pub vision:               GeminiConfig,
  #[serde(default)]
  pub retry:                RetrySettings,
  /// Where cards from the privileged submitter are POSTed, if anywhere.
  #[serde(default)]
  pub export_webhook:       Option<String>,
}

/// Extraction backoff. The number of attempts is fixed at
/// [`rolo_extract::MAX_ATTEMPTS`] and cannot be configured.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct RetrySettings {
  pub base_delay_secs: u64,
}

impl Default for RetrySettings {
  fn default() -> Self { Self { base_delay_secs: 2 } }
}

impl RetrySettings {
  pub fn policy(self) -> RetryPolicy {
    RetryPolicy { base_delay: Duration::from_secs(self.base_delay_secs) }
  }
}

/// Read `path` (optional) and the environment into a [`ServerConfig`].
///
/// Environment keys take the form `ROLO_PORT` or, for nested tables,
/// `ROLO_VISION__API_KEY`.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("ROLO")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The production extractor: Gemini behind the retrying gateway.
pub type Extractor = Gateway<GeminiTransport>;

/// The production lifecycle manager.
pub type Service = CardService<SqliteStore, Option<WebhookSink>>;

/// The API router with request tracing.
pub fn app<S, X, K>(state: AppState<S, X, K>) -> Router
where
  S: CardStore + 'static,
  X: CardExtractor + 'static,
  K: ExportSink + 'static,
{
  api_router(state).layer(TraceLayer::new_for_http())
}
