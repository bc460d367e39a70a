//! [`SqliteStore`]: the SQLite implementation of [`CardStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use rolo_core::{
  card::{CardFields, CardPatch, CardRecord, NewCard},
  dedup::DedupKeys,
  store::{CardStore, SubmitterSummary},
  visibility::CardScope,
};

use crate::{
  encode::{encode_dt, encode_uuid, RawCard, CARD_COLUMNS},
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rolo card store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT` over [`CARD_COLUMNS`] and decode every row.
  async fn select_cards(
    &self,
    filter: &'static str,
    args: Vec<String>,
  ) -> Result<Vec<CardRecord>> {
    let raws: Vec<RawCard> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards {filter} ORDER BY rowid");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args.iter()), RawCard::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCard::into_card).collect()
  }
}

/// Owned column values for the eight editable fields plus the comparison keys,
/// in `cards` column order.
fn field_columns(fields: &CardFields) -> [Option<String>; 10] {
  let keys = DedupKeys::of(fields);
  [
    fields.name.clone(),
    fields.company.clone(),
    fields.designation.clone(),
    fields.email.clone(),
    fields.phone.clone(),
    fields.address.clone(),
    fields.website.clone(),
    fields.additional_info.clone(),
    keys.name,
    keys.company,
  ]
}

// ─── CardStore impl ──────────────────────────────────────────────────────────

impl CardStore for SqliteStore {
  type Error = crate::Error;

  async fn insert(&self, card: NewCard) -> Result<CardRecord> {
    let record = CardRecord {
      id:                Uuid::new_v4(),
      fields:            card.fields,
      submitted_by:      card.submitted_by,
      shared:            false,
      created_at:        Utc::now(),
      original_filename: card.original_filename,
    };

    let id_str = encode_uuid(record.id);
    let at_str = encode_dt(record.created_at);
    let by = record.submitted_by.clone();
    let filename = record.original_filename.clone();
    let [name, company, designation, email, phone, address, website, info, name_key, company_key] =
      field_columns(&record.fields);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cards (
             card_id, submitted_by, shared, created_at, original_filename,
             name, company, designation, email, phone, address, website,
             additional_info, name_key, company_key
           ) VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
          rusqlite::params![
            id_str, by, at_str, filename, name, company, designation, email,
            phone, address, website, info, name_key, company_key
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn update_fields(&self, id: Uuid, patch: &CardPatch) -> Result<Option<CardRecord>> {
    let id_str = encode_uuid(id);
    let changes = patch.changes.clone();

    let raw: Option<RawCard> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE card_id = ?1");
        let Some(mut raw) = tx
          .query_row(&sql, rusqlite::params![id_str], RawCard::from_row)
          .optional()?
        else {
          return Ok(None);
        };

        // Only the patched columns and the keys derived from the merged card
        // are written.
        let mut values: Vec<Option<String>> = vec![Some(id_str)];
        let mut assignments = Vec::with_capacity(changes.len() + 2);
        for (field, value) in changes {
          *raw.fields.slot_mut(field) = value.clone();
          values.push(value);
          assignments.push(format!("{} = ?{}", field.as_str(), values.len()));
        }
        let keys = DedupKeys::of(&raw.fields);
        values.push(keys.name);
        assignments.push(format!("name_key = ?{}", values.len()));
        values.push(keys.company);
        assignments.push(format!("company_key = ?{}", values.len()));

        tx.execute(
          &format!("UPDATE cards SET {} WHERE card_id = ?1", assignments.join(", ")),
          rusqlite::params_from_iter(values.iter()),
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawCard::into_card).transpose()
  }

  async fn toggle_shared(&self, id: Uuid) -> Result<Option<bool>> {
    let id_str = encode_uuid(id);
    let shared = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "UPDATE cards SET shared = NOT shared WHERE card_id = ?1 RETURNING shared",
              rusqlite::params![id_str],
              |r| r.get::<_, bool>(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(shared)
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM cards WHERE card_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn get(&self, id: Uuid) -> Result<Option<CardRecord>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawCard> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE card_id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawCard::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCard::into_card).transpose()
  }

  async fn list(&self, scope: &CardScope) -> Result<Vec<CardRecord>> {
    match scope {
      CardScope::Nothing => Ok(Vec::new()),
      CardScope::All => self.select_cards("", Vec::new()).await,
      CardScope::SubmittedBy(who) => {
        self
          .select_cards("WHERE submitted_by = ?1", vec![who.clone()])
          .await
      }
      CardScope::Published { privileged, own: None } => {
        self
          .select_cards("WHERE shared = 1 OR submitted_by = ?1", vec![privileged.clone()])
          .await
      }
      CardScope::Published { privileged, own: Some(own) } => {
        self
          .select_cards(
            "WHERE shared = 1 OR submitted_by = ?1 OR submitted_by = ?2",
            vec![privileged.clone(), own.clone()],
          )
          .await
      }
    }
  }

  async fn find_duplicate(
    &self,
    submitted_by: &str,
    keys: &DedupKeys,
  ) -> Result<Option<CardRecord>> {
    if !keys.is_checkable() {
      return Ok(None);
    }

    let by = submitted_by.to_owned();
    let keys = keys.clone();
    let raw: Option<RawCard> = self
      .conn
      .call(move |conn| {
        // NULL never compares equal, so absent keys drop out of the match.
        let sql = format!(
          "SELECT {CARD_COLUMNS} FROM cards
           WHERE submitted_by = ?1
             AND (email = ?2
                  OR trim(phone) = ?3
                  OR (name_key = ?4 AND company_key = ?5))
           ORDER BY rowid
           LIMIT 1"
        );
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![by, keys.email, keys.phone, keys.name, keys.company],
              RawCard::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCard::into_card).transpose()
  }

  async fn count(&self, submitted_by: Option<&str>) -> Result<u64> {
    let by = submitted_by.map(str::to_owned);
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM cards WHERE ?1 IS NULL OR submitted_by = ?1",
          rusqlite::params![by],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(n.max(0) as u64)
  }

  async fn submitters(&self) -> Result<Vec<SubmitterSummary>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT submitted_by, COUNT(*) FROM cards
           GROUP BY submitted_by
           ORDER BY submitted_by",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(identity, cards)| SubmitterSummary { identity, cards: cards.max(0) as u64 })
        .collect(),
    )
  }
}
