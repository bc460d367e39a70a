//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rolo_core::extract::ExtractionFailure;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The request carried no usable actor identity.
  #[error("unauthenticated: {0}")]
  Unauthenticated(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] rolo_core::Error),
}

fn extraction_status(kind: ExtractionFailure) -> StatusCode {
  match kind {
    ExtractionFailure::RateLimited => StatusCode::TOO_MANY_REQUESTS,
    ExtractionFailure::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    ExtractionFailure::Timeout => StatusCode::GATEWAY_TIMEOUT,
    ExtractionFailure::NetworkFailure | ExtractionFailure::PermanentFailure => {
      StatusCode::BAD_GATEWAY
    }
    ExtractionFailure::MalformedResponse => StatusCode::UNPROCESSABLE_ENTITY,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    use rolo_core::Error as E;

    let (status, body) = match &self {
      ApiError::Unauthenticated(m) => (StatusCode::UNAUTHORIZED, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Core(e) => match e {
        E::Extraction(x) => (
          extraction_status(x.kind),
          json!({ "error": x.detail, "kind": x.kind.as_str(), "attempts": x.attempts }),
        ),
        E::Duplicate(key) => (
          StatusCode::CONFLICT,
          json!({ "error": e.to_string(), "matched": key }),
        ),
        E::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": e.to_string() })),
        E::NoChange(_) | E::Validation(_) => {
          (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() }))
        }
        E::Unauthorized => (StatusCode::FORBIDDEN, json!({ "error": e.to_string() })),
        E::Store(inner) => {
          error!(error = %inner, "store failure");
          (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
        }
      },
    };
    (status, Json(body)).into_response()
  }
}
