//! Card types, the unit of the Rolo store.
//!
//! A card is one business card as read by the extraction service: eight
//! optional text attributes plus system attributes assigned at creation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Fields ──────────────────────────────────────────────────────────────────

/// The extracted attributes of a card. Every attribute is optional because
/// the extraction service reports unreadable fields as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFields {
  pub name:            Option<String>,
  pub company:         Option<String>,
  pub designation:     Option<String>,
  pub email:           Option<String>,
  pub phone:           Option<String>,
  pub address:         Option<String>,
  pub website:         Option<String>,
  pub additional_info: Option<String>,
}

impl CardFields {
  pub fn get(&self, field: CardField) -> Option<&str> {
    match field {
      CardField::Name => self.name.as_deref(),
      CardField::Company => self.company.as_deref(),
      CardField::Designation => self.designation.as_deref(),
      CardField::Email => self.email.as_deref(),
      CardField::Phone => self.phone.as_deref(),
      CardField::Address => self.address.as_deref(),
      CardField::Website => self.website.as_deref(),
      CardField::AdditionalInfo => self.additional_info.as_deref(),
    }
  }

  pub fn slot_mut(&mut self, field: CardField) -> &mut Option<String> {
    match field {
      CardField::Name => &mut self.name,
      CardField::Company => &mut self.company,
      CardField::Designation => &mut self.designation,
      CardField::Email => &mut self.email,
      CardField::Phone => &mut self.phone,
      CardField::Address => &mut self.address,
      CardField::Website => &mut self.website,
      CardField::AdditionalInfo => &mut self.additional_info,
    }
  }

  /// `true` if no attribute carries a value.
  pub fn is_empty(&self) -> bool {
    CardField::ALL.iter().all(|f| self.get(*f).is_none())
  }
}

/// Names of the editable card attributes; the JSON key of each is its
/// snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CardField {
  Name,
  Company,
  Designation,
  Email,
  Phone,
  Address,
  Website,
  AdditionalInfo,
}

impl CardField {
  pub const ALL: [CardField; 8] = [
    Self::Name,
    Self::Company,
    Self::Designation,
    Self::Email,
    Self::Phone,
    Self::Address,
    Self::Website,
    Self::AdditionalInfo,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Name => "name",
      Self::Company => "company",
      Self::Designation => "designation",
      Self::Email => "email",
      Self::Phone => "phone",
      Self::Address => "address",
      Self::Website => "website",
      Self::AdditionalInfo => "additional_info",
    }
  }

  pub fn from_name(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|f| f.as_str() == s)
  }
}

impl fmt::Display for CardField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Card ────────────────────────────────────────────────────────────────────

/// A persisted card.
///
/// `id`, `submitted_by`, `created_at` and `original_filename` never change
/// after creation. `shared` changes only through the share toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
  pub id:                Uuid,
  #[serde(flatten)]
  pub fields:            CardFields,
  /// Identity of the actor whose submission created the card.
  pub submitted_by:      String,
  pub shared:            bool,
  /// Server-assigned; a best-effort ordering hint only.
  pub created_at:        DateTime<Utc>,
  pub original_filename: Option<String>,
}

/// Input to [`crate::store::CardStore::insert`]. The store assigns `id` and
/// `created_at`; new cards always start unshared.
#[derive(Debug, Clone)]
pub struct NewCard {
  pub fields:            CardFields,
  pub submitted_by:      String,
  pub original_filename: Option<String>,
}

// ─── Image ───────────────────────────────────────────────────────────────────

/// Image media types the extraction service is fed.
pub const ACCEPTED_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// A submitted card photograph. Held in memory only; nothing is written to
/// disk on the way to the extraction service.
#[derive(Debug, Clone)]
pub struct CardImage {
  pub bytes:      Vec<u8>,
  pub media_type: String,
  pub filename:   Option<String>,
}

impl CardImage {
  /// Validate the payload and build an image. `image/jpg` is accepted as an
  /// alias of `image/jpeg`.
  pub fn new(
    bytes: Vec<u8>,
    media_type: &str,
    filename: Option<String>,
  ) -> Result<Self> {
    if bytes.is_empty() {
      return Err(Error::Validation("image payload is empty".into()));
    }
    let media_type = match media_type
      .split(';')
      .next()
      .unwrap_or_default()
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      "image/jpg" => "image/jpeg".to_owned(),
      other => other.to_owned(),
    };
    if !ACCEPTED_MEDIA_TYPES.contains(&media_type.as_str()) {
      return Err(Error::Validation(format!(
        "unsupported image type {media_type:?}; upload a JPEG or PNG"
      )));
    }
    let filename = filename
      .map(|f| f.trim().to_owned())
      .filter(|f| !f.is_empty());
    Ok(Self { bytes, media_type, filename })
  }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// Attributes that no update may touch. `shared` is listed because it moves
/// only through the share toggle.
pub const IMMUTABLE_ATTRIBUTES: &[&str] =
  &["id", "submitted_by", "created_at", "original_filename", "shared"];

/// A partial replacement of card fields. `None` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
  pub changes: Vec<(CardField, Option<String>)>,
}

impl CardPatch {
  pub fn set(mut self, field: CardField, value: Option<&str>) -> Self {
    self.changes.push((field, value.map(str::to_owned)));
    self
  }

  /// Parse a JSON object such as `{"phone": "+1 555", "website": null}`.
  ///
  /// Fails with [`Error::Validation`] on immutable or unknown keys and on
  /// values that are neither strings nor `null`.
  pub fn from_json(value: serde_json::Value) -> Result<Self> {
    let serde_json::Value::Object(map) = value else {
      return Err(Error::Validation("update body must be a JSON object".into()));
    };

    let mut changes = Vec::with_capacity(map.len());
    for (key, value) in map {
      if IMMUTABLE_ATTRIBUTES.contains(&key.as_str()) {
        return Err(Error::Validation(format!("`{key}` cannot be updated")));
      }
      let field = CardField::from_name(&key)
        .ok_or_else(|| Error::Validation(format!("unknown field `{key}`")))?;
      let value = match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        _ => {
          return Err(Error::Validation(format!(
            "`{key}` must be a string or null"
          )));
        }
      };
      changes.push((field, value));
    }
    Ok(Self { changes })
  }
}
