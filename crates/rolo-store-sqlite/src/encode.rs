//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, booleans as `0`/`1`.

use chrono::{DateTime, Utc};
use rolo_core::card::{CardFields, CardRecord};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that builds a [`RawCard`].
pub const CARD_COLUMNS: &str = "card_id, submitted_by, shared, created_at, original_filename,
   name, company, designation, email, phone, address, website, additional_info";

/// Raw values read directly from a `cards` row.
pub struct RawCard {
  pub card_id:           String,
  pub submitted_by:      String,
  pub shared:            bool,
  pub created_at:        String,
  pub original_filename: Option<String>,
  pub fields:            CardFields,
}

impl RawCard {
  /// Read a row selected with [`CARD_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      card_id:           row.get(0)?,
      submitted_by:      row.get(1)?,
      shared:            row.get(2)?,
      created_at:        row.get(3)?,
      original_filename: row.get(4)?,
      fields:            CardFields {
        name:            row.get(5)?,
        company:         row.get(6)?,
        designation:     row.get(7)?,
        email:           row.get(8)?,
        phone:           row.get(9)?,
        address:         row.get(10)?,
        website:         row.get(11)?,
        additional_info: row.get(12)?,
      },
    })
  }

  pub fn into_card(self) -> Result<CardRecord> {
    Ok(CardRecord {
      id:                decode_uuid(&self.card_id)?,
      fields:            self.fields,
      submitted_by:      self.submitted_by,
      shared:            self.shared,
      created_at:        decode_dt(&self.created_at)?,
      original_filename: self.original_filename,
    })
  }
}
