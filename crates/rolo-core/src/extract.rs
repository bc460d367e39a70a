//! Extraction contract: the raw record schema, failure taxonomy, and the
//! [`CardExtractor`] trait implemented by the extraction gateway.

use std::{fmt, future::Future};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::{CardField, CardFields, CardImage};

// ─── Raw record ──────────────────────────────────────────────────────────────

/// A card exactly as the vision service described it, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCard {
  pub fields: CardFields,
}

impl RawCard {
  /// Read the eight known keys out of a JSON object. Unknown keys are
  /// ignored; `null` and missing keys become absent. Numbers and booleans are
  /// kept in their textual form, lists of strings are joined with `", "`.
  pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
    let mut fields = CardFields::default();
    for field in CardField::ALL {
      *fields.slot_mut(field) = object.get(field.as_str()).and_then(text_of);
    }
    Self { fields }
  }
}

fn text_of(value: &serde_json::Value) -> Option<String> {
  use serde_json::Value;
  match value {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Array(items) => {
      let parts: Vec<String> = items.iter().filter_map(text_of).collect();
      (!parts.is_empty()).then(|| parts.join(", "))
    }
    Value::Object(_) => Some(value.to_string()),
  }
}

// ─── Failures ────────────────────────────────────────────────────────────────

/// Classification of a failed extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionFailure {
  /// HTTP 429.
  RateLimited,
  /// HTTP 503.
  Unavailable,
  Timeout,
  NetworkFailure,
  /// A successful response without a parseable JSON object in it.
  MalformedResponse,
  /// Any other non-success status.
  PermanentFailure,
}

impl ExtractionFailure {
  /// Transient failures may succeed on a later attempt.
  pub fn is_retryable(self) -> bool {
    matches!(
      self,
      Self::RateLimited | Self::Unavailable | Self::Timeout | Self::NetworkFailure
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::RateLimited => "rate_limited",
      Self::Unavailable => "unavailable",
      Self::Timeout => "timeout",
      Self::NetworkFailure => "network_failure",
      Self::MalformedResponse => "malformed_response",
      Self::PermanentFailure => "permanent_failure",
    }
  }
}

impl fmt::Display for ExtractionFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Terminal outcome of an extraction that did not succeed. Callers must not
/// retry it; the gateway already has.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} after {attempts} attempt(s): {detail}")]
pub struct ExtractionError {
  pub kind:         ExtractionFailure,
  /// Attempts performed, including the failing one.
  pub attempts:     u32,
  /// HTTP status of the last attempt, when one was received.
  pub status:       Option<u16>,
  pub detail:       String,
  /// The model's raw text, kept for diagnosing malformed responses.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub raw_response: Option<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Turns a card photograph into a [`RawCard`].
pub trait CardExtractor: Send + Sync {
  fn extract<'a>(
    &'a self,
    image: &'a CardImage,
  ) -> impl Future<Output = Result<RawCard, ExtractionError>> + Send + 'a;
}
