//! In-memory [`CardStore`] used by the unit tests of this crate.

use std::{collections::BTreeMap, convert::Infallible, sync::Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::{
  card::{CardPatch, CardRecord, NewCard},
  dedup::DedupKeys,
  store::{CardStore, SubmitterSummary},
  visibility::CardScope,
};

#[derive(Default)]
pub struct MemoryStore {
  cards: Mutex<Vec<CardRecord>>,
}

impl MemoryStore {
  fn with<T>(&self, f: impl FnOnce(&mut Vec<CardRecord>) -> T) -> T {
    f(&mut self.cards.lock().unwrap())
  }
}

impl CardStore for MemoryStore {
  type Error = Infallible;

  async fn insert(&self, card: NewCard) -> Result<CardRecord, Infallible> {
    let record = CardRecord {
      id:                Uuid::new_v4(),
      fields:            card.fields,
      submitted_by:      card.submitted_by,
      shared:            false,
      created_at:        Utc::now(),
      original_filename: card.original_filename,
    };
    self.with(|cards| cards.push(record.clone()));
    Ok(record)
  }

  async fn update_fields(
    &self,
    id: Uuid,
    patch: &CardPatch,
  ) -> Result<Option<CardRecord>, Infallible> {
    Ok(self.with(|cards| {
      let card = cards.iter_mut().find(|c| c.id == id)?;
      for (field, value) in &patch.changes {
        *card.fields.slot_mut(*field) = value.clone();
      }
      Some(card.clone())
    }))
  }

  async fn toggle_shared(&self, id: Uuid) -> Result<Option<bool>, Infallible> {
    Ok(self.with(|cards| {
      let card = cards.iter_mut().find(|c| c.id == id)?;
      card.shared = !card.shared;
      Some(card.shared)
    }))
  }

  async fn delete(&self, id: Uuid) -> Result<bool, Infallible> {
    Ok(self.with(|cards| {
      let before = cards.len();
      cards.retain(|c| c.id != id);
      cards.len() != before
    }))
  }

  async fn get(&self, id: Uuid) -> Result<Option<CardRecord>, Infallible> {
    Ok(self.with(|cards| cards.iter().find(|c| c.id == id).cloned()))
  }

  async fn list(&self, scope: &CardScope) -> Result<Vec<CardRecord>, Infallible> {
    Ok(self.with(|cards| cards.iter().filter(|c| scope.matches(c)).cloned().collect()))
  }

  async fn find_duplicate(
    &self,
    submitted_by: &str,
    keys: &DedupKeys,
  ) -> Result<Option<CardRecord>, Infallible> {
    Ok(self.with(|cards| {
      cards
        .iter()
        .filter(|c| c.submitted_by == submitted_by)
        .find(|c| keys.matched_by(&DedupKeys::of(&c.fields)).is_some())
        .cloned()
    }))
  }

  async fn count(&self, submitted_by: Option<&str>) -> Result<u64, Infallible> {
    Ok(self.with(|cards| {
      cards
        .iter()
        .filter(|c| submitted_by.is_none_or(|who| c.submitted_by == who))
        .count() as u64
    }))
  }

  async fn submitters(&self) -> Result<Vec<SubmitterSummary>, Infallible> {
    Ok(self.with(|cards| {
      let mut counts = BTreeMap::<String, u64>::new();
      for c in cards.iter() {
        *counts.entry(c.submitted_by.clone()).or_default() += 1;
      }
      counts
        .into_iter()
        .map(|(identity, cards)| SubmitterSummary { identity, cards })
        .collect()
    }))
  }
}
