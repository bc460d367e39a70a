//! Bounded retries and failure classification around a [`VisionTransport`].
//!
//! Each attempt is classified as success or one of the
//! [`ExtractionFailure`] kinds. Transient kinds (rate limiting,
//! unavailability, timeouts, network errors) are retried with exponential
//! backoff; malformed responses and other statuses end the extraction at once.
//!
//! Backoff waits are plain `tokio::time::sleep` calls, so dropping the
//! extraction future during a wait stops any further attempt.

use std::time::Duration;

use rolo_core::{
  card::CardImage,
  extract::{CardExtractor, ExtractionError, ExtractionFailure, RawCard},
};
use tracing::{debug, warn};

use crate::{
  parse::parse_card,
  transport::{TransportError, VisionTransport},
};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Total attempts per extraction, including the first. Not configurable.
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff between attempts. Only the delay can be tuned; the attempt count
/// is always [`MAX_ATTEMPTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self { Self { base_delay: Duration::from_secs(2) } }
}

impl RetryPolicy {
  /// Wait before 1-indexed `attempt` (≥ 2): `base_delay`, then doubling.
  pub fn delay_before(&self, attempt: u32) -> Duration {
    self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(2))
  }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

pub struct Gateway<T> {
  transport: T,
  policy:    RetryPolicy,
}

impl<T: VisionTransport> Gateway<T> {
  pub fn new(transport: T, policy: RetryPolicy) -> Self { Self { transport, policy } }

  pub fn policy(&self) -> RetryPolicy { self.policy }
}

/// One classified failed attempt.
struct Failure {
  kind:   ExtractionFailure,
  status: Option<u16>,
  detail: String,
  raw:    Option<String>,
}

impl Failure {
  fn into_error(self, attempts: u32) -> ExtractionError {
    ExtractionError {
      kind: self.kind,
      attempts,
      status: self.status,
      detail: self.detail,
      raw_response: self.raw,
    }
  }
}

fn classify(err: TransportError) -> Failure {
  let (kind, status, detail) = match err {
    TransportError::Status { code: 429, .. } => (
      ExtractionFailure::RateLimited,
      Some(429),
      "too many requests to the vision service; try again in a few minutes".to_owned(),
    ),
    TransportError::Status { code: 503, .. } => (
      ExtractionFailure::Unavailable,
      Some(503),
      "the vision service is temporarily unavailable".to_owned(),
    ),
    TransportError::Status { code, body } => (
      ExtractionFailure::PermanentFailure,
      Some(code),
      format!("vision service request failed with status {code}: {body}"),
    ),
    TransportError::Timeout => (
      ExtractionFailure::Timeout,
      None,
      "the vision service took too long; try a smaller image".to_owned(),
    ),
    TransportError::Network(e) => (
      ExtractionFailure::NetworkFailure,
      None,
      format!("failed to reach the vision service: {e}"),
    ),
    TransportError::Envelope(e) => (ExtractionFailure::MalformedResponse, Some(200), e),
  };
  Failure { kind, status, detail, raw: None }
}

impl<T: VisionTransport> CardExtractor for Gateway<T> {
  async fn extract(&self, image: &CardImage) -> Result<RawCard, ExtractionError> {
    let mut attempt = 1;

    loop {
      let failure = match self.transport.send(image).await {
        Ok(text) => match parse_card(&text) {
          Ok(card) => {
            debug!(attempt, "extraction succeeded");
            return Ok(card);
          }
          Err(detail) => Failure {
            kind: ExtractionFailure::MalformedResponse,
            status: Some(200),
            detail,
            raw: Some(text),
          },
        },
        Err(e) => classify(e),
      };

      if !failure.kind.is_retryable() || attempt >= MAX_ATTEMPTS {
        warn!(
          attempt,
          kind = %failure.kind,
          detail = %failure.detail,
          "extraction failed"
        );
        return Err(failure.into_error(attempt));
      }

      let delay = self.policy.delay_before(attempt + 1);
      warn!(
        attempt,
        max_attempts = MAX_ATTEMPTS,
        kind = %failure.kind,
        delay_secs = delay.as_secs_f64(),
        "transient extraction failure; retrying"
      );
      tokio::time::sleep(delay).await;
      attempt += 1;
    }
  }
}
