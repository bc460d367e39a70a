//! The single-attempt transport seam beneath the gateway.

use std::future::Future;

use rolo_core::card::CardImage;
use thiserror::Error;

/// Why one attempt against the vision service produced no model text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
  #[error("service returned status {code}")]
  Status { code: u16, body: String },

  #[error("request timed out")]
  Timeout,

  #[error("network error: {0}")]
  Network(String),

  /// A success status whose envelope carried no model text.
  #[error("unexpected response envelope: {0}")]
  Envelope(String),
}

/// Sends one request to the vision service and returns the model's free text.
/// Implementations never retry.
pub trait VisionTransport: Send + Sync {
  fn send<'a>(
    &'a self,
    image: &'a CardImage,
  ) -> impl Future<Output = Result<String, TransportError>> + Send + 'a;
}
