//! Error types for `rolo-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{dedup::DedupKey, extract::ExtractionError};

#[derive(Debug, Error)]
pub enum Error {
  #[error("extraction failed: {0}")]
  Extraction(#[from] ExtractionError),

  #[error("duplicate card detected: matching {0}")]
  Duplicate(DedupKey),

  #[error("card not found: {0}")]
  NotFound(Uuid),

  #[error("update would not change card {0}")]
  NoChange(Uuid),

  #[error("not permitted")]
  Unauthorized,

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
