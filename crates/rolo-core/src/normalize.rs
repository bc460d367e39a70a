//! Record normalizer.
//!
//! Canonicalises extracted fields before comparison and storage: every value
//! is trimmed, whitespace-only values become absent, and `email` is stored
//! lower-cased. Comparison keys (lower-cased `name`, `company`, `email`) are
//! derived on demand and never replace the stored casing.

use serde::Serialize;

use crate::{
  card::{CardField, CardFields},
  extract::RawCard,
};

/// A card whose fields have passed through [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedCard {
  pub fields: CardFields,
}

impl NormalizedCard {
  pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}

pub fn normalize(raw: RawCard) -> NormalizedCard {
  let mut fields = raw.fields;
  for field in CardField::ALL {
    let slot = fields.slot_mut(field);
    *slot = normalize_value(field, slot.take());
  }
  NormalizedCard { fields }
}

/// Normalise a single attribute value the way [`normalize`] does.
pub fn normalize_value(field: CardField, value: Option<String>) -> Option<String> {
  let trimmed = value?.trim().to_owned();
  if trimmed.is_empty() {
    return None;
  }
  Some(match field {
    CardField::Email => trimmed.to_lowercase(),
    _ => trimmed,
  })
}

/// The case-folded form used when comparing `name`, `company` and `email`.
pub fn comparison_key(value: &str) -> String { value.trim().to_lowercase() }
