//! Deduplication engine.
//!
//! A new card duplicates an existing one when, among cards submitted by the
//! same actor, any of these holds:
//!
//! 1. both have the same non-empty normalized email;
//! 2. both have the same non-empty trimmed phone;
//! 3. both have the same non-empty normalized name *and* company.
//!
//! Matching never crosses submitters. Near-miss spellings are not caught.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::{
  Error, Result,
  card::CardFields,
  normalize::{NormalizedCard, comparison_key},
  store::CardStore,
};

/// Which comparison key produced a duplicate match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
  Email,
  Phone,
  NameAndCompany,
}

impl fmt::Display for DedupKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Email => "email",
      Self::Phone => "phone",
      Self::NameAndCompany => "name and company",
    })
  }
}

/// The comparison keys of one card. Absent keys never match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupKeys {
  pub email:   Option<String>,
  pub phone:   Option<String>,
  pub name:    Option<String>,
  pub company: Option<String>,
}

impl DedupKeys {
  pub fn of(fields: &CardFields) -> Self {
    let key = |v: &Option<String>| {
      v.as_deref().map(comparison_key).filter(|k| !k.is_empty())
    };
    Self {
      email:   key(&fields.email),
      phone:   fields
        .phone
        .as_deref()
        .map(|p| p.trim().to_owned())
        .filter(|p| !p.is_empty()),
      name:    key(&fields.name),
      company: key(&fields.company),
    }
  }

  /// `true` if at least one of the three rules has operands to compare.
  pub fn is_checkable(&self) -> bool {
    self.email.is_some()
      || self.phone.is_some()
      || (self.name.is_some() && self.company.is_some())
  }

  /// The first rule under which `self` and `other` collide.
  pub fn matched_by(&self, other: &DedupKeys) -> Option<DedupKey> {
    fn same(a: &Option<String>, b: &Option<String>) -> bool {
      matches!((a, b), (Some(a), Some(b)) if a == b)
    }
    if same(&self.email, &other.email) {
      Some(DedupKey::Email)
    } else if same(&self.phone, &other.phone) {
      Some(DedupKey::Phone)
    } else if same(&self.name, &other.name) && same(&self.company, &other.company) {
      Some(DedupKey::NameAndCompany)
    } else {
      None
    }
  }
}

/// Look for an earlier card by `submitted_by` that `card` duplicates.
pub async fn find_duplicate<S: CardStore>(
  store: &S,
  card: &NormalizedCard,
  submitted_by: &str,
) -> Result<Option<DedupKey>> {
  let keys = DedupKeys::of(&card.fields);
  if !keys.is_checkable() {
    debug!(submitted_by, "no dedup keys present; skipping duplicate check");
    return Ok(None);
  }

  let existing = store
    .find_duplicate(submitted_by, &keys)
    .await
    .map_err(Error::store)?;

  let matched = existing.and_then(|c| keys.matched_by(&DedupKeys::of(&c.fields)));
  if let Some(key) = matched {
    debug!(submitted_by, %key, "duplicate card found");
  }
  Ok(matched)
}

/// Boolean form of [`find_duplicate`].
pub async fn is_duplicate<S: CardStore>(
  store: &S,
  card: &NormalizedCard,
  submitted_by: &str,
) -> Result<bool> {
  Ok(find_duplicate(store, card, submitted_by).await?.is_some())
}
