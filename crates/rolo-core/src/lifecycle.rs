//! Card lifecycle manager.
//!
//! ```text
//! Extracted (not persisted) ──create──▶ Stored ◀──toggle_share──▶ Shared
//!                                         │  update keeps the sub-state
//!                                         └──delete──▶ Deleted (terminal)
//! ```
//!
//! [`CardService`] is the only writer of cards. It runs the submission
//! pipeline (extract, normalize, duplicate check, persist), applies the
//! [`AccessPolicy`] to every read and mutation, and feeds the export sink.
//! Export pushes run on their own task and never hold up the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  actor::Actor,
  card::{CardImage, CardPatch, CardRecord, NewCard},
  dedup,
  export::{ExportSink, NoExport},
  extract::CardExtractor,
  locks::KeyedLocks,
  normalize::{NormalizedCard, normalize, normalize_value},
  store::{CardStore, SubmitterSummary},
  visibility::{AccessPolicy, ReadPath},
};

/// Outcome of [`CardService::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "card", rename_all = "snake_case")]
pub enum Submission {
  /// The card was persisted.
  Stored(CardRecord),
  /// Extract-only mode: the card passed every check but was not persisted.
  Preview(NormalizedCard),
}

/// Options for [`CardService::submit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitOptions {
  /// Run extraction and checks without persisting.
  pub extract_only: bool,
}

pub struct CardService<S, K = NoExport> {
  store:      S,
  policy:     AccessPolicy,
  sink:       Arc<K>,
  submitters: KeyedLocks,
  cards:      KeyedLocks,
}

impl<S: CardStore> CardService<S> {
  pub fn new(store: S, policy: AccessPolicy) -> Self {
    Self::with_sink(store, policy, NoExport)
  }
}

impl<S: CardStore, K: ExportSink> CardService<S, K> {
  pub fn with_sink(store: S, policy: AccessPolicy, sink: K) -> Self {
    Self {
      store,
      policy,
      sink: Arc::new(sink),
      submitters: KeyedLocks::default(),
      cards: KeyedLocks::default(),
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn policy(&self) -> &AccessPolicy { &self.policy }

  // ── Creation ──────────────────────────────────────────────────────────

  /// Run the whole submission pipeline for one photograph.
  ///
  /// Nothing is persisted unless extraction succeeds, the card has at least
  /// one field, and it does not duplicate one of `actor`'s earlier cards.
  pub async fn submit<X: CardExtractor>(
    &self,
    extractor: &X,
    actor: &Actor,
    image: &CardImage,
    options: SubmitOptions,
  ) -> Result<Submission> {
    let raw = extractor.extract(image).await?;
    let card = normalize(raw);
    if card.is_empty() {
      return Err(Error::Validation("no card details could be read".into()));
    }

    if options.extract_only {
      if let Some(key) =
        dedup::find_duplicate(&self.store, &card, &actor.identity).await?
      {
        return Err(Error::Duplicate(key));
      }
      return Ok(Submission::Preview(card));
    }

    self
      .create(card, &actor.identity, image.filename.clone())
      .await
      .map(Submission::Stored)
  }

  /// Persist a normalized card for `submitted_by` unless it duplicates one
  /// of their earlier cards.
  ///
  /// The duplicate check and the insert run under a per-submitter lock, so
  /// two concurrent submissions of the same card cannot both succeed.
  pub async fn create(
    &self,
    card: NormalizedCard,
    submitted_by: &str,
    original_filename: Option<String>,
  ) -> Result<CardRecord> {
    if card.is_empty() {
      return Err(Error::Validation("card has no fields".into()));
    }

    let record = {
      let _guard = self.submitters.acquire(submitted_by).await;

      if let Some(key) = dedup::find_duplicate(&self.store, &card, submitted_by).await? {
        return Err(Error::Duplicate(key));
      }

      self
        .store
        .insert(NewCard {
          fields: card.fields,
          submitted_by: submitted_by.to_owned(),
          original_filename,
        })
        .await
        .map_err(Error::store)?
    };

    info!(card_id = %record.id, submitted_by, "card stored");

    if self.policy.is_privileged(submitted_by) {
      self.export(record.clone());
    }

    Ok(record)
  }

  /// Push `card` to the sink on a background task. Failures are logged.
  fn export(&self, card: CardRecord) {
    let sink = Arc::clone(&self.sink);
    tokio::spawn(async move {
      match sink.push(&card).await {
        Ok(()) => debug!(card_id = %card.id, "card exported"),
        Err(e) => warn!(card_id = %card.id, error = %e, "card export failed"),
      }
    });
  }

  // ── Mutation ──────────────────────────────────────────────────────────

  /// Apply a partial field update.
  ///
  /// Fails with `NotFound` for unknown ids, `Unauthorized` unless the actor
  /// is the submitter or an admin, and `NoChange` if every value already
  /// matches. Only the patched fields are written, and updates to one card
  /// run one at a time, so concurrent patches of different fields all land.
  pub async fn update(
    &self,
    actor: &Actor,
    id: Uuid,
    patch: CardPatch,
  ) -> Result<CardRecord> {
    let _guard = self.cards.acquire(&id.to_string()).await;
    let card = self.load_mutable(actor, id).await?;

    let patch = CardPatch {
      changes: patch
        .changes
        .into_iter()
        .map(|(field, value)| (field, normalize_value(field, value)))
        .collect(),
    };
    let mut fields = card.fields.clone();
    for (field, value) in &patch.changes {
      *fields.slot_mut(*field) = value.clone();
    }
    if fields == card.fields {
      return Err(Error::NoChange(id));
    }
    if fields.is_empty() {
      return Err(Error::Validation("a card must keep at least one field".into()));
    }

    let updated = self
      .store
      .update_fields(id, &patch)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;
    info!(card_id = %id, actor = %actor.identity, "card updated");

    Ok(updated)
  }

  /// Flip the `shared` flag. Calling it twice restores the original value.
  ///
  /// The flip happens in the store, so every call toggles exactly once even
  /// when several race on the same card.
  pub async fn toggle_share(&self, actor: &Actor, id: Uuid) -> Result<CardRecord> {
    let mut card = self.load_mutable(actor, id).await?;

    let shared = self
      .store
      .toggle_shared(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;
    info!(card_id = %id, actor = %actor.identity, shared, "card share toggled");

    card.shared = shared;
    Ok(card)
  }

  /// Remove a card permanently.
  pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<()> {
    self.load_mutable(actor, id).await?;

    if !self.store.delete(id).await.map_err(Error::store)? {
      return Err(Error::NotFound(id));
    }
    info!(card_id = %id, actor = %actor.identity, "card deleted");
    Ok(())
  }

  async fn load_mutable(&self, actor: &Actor, id: Uuid) -> Result<CardRecord> {
    let card = self
      .store
      .get(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;
    if !self.policy.can_mutate(actor, &card) {
      return Err(Error::Unauthorized);
    }
    Ok(card)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Cards `actor` may observe on `path`. `submitted_by` narrows admin
  /// listings and is ignored for everyone else.
  pub async fn list(
    &self,
    actor: &Actor,
    path: ReadPath,
    submitted_by: Option<&str>,
  ) -> Result<Vec<CardRecord>> {
    let scope = self.policy.scope(actor, path, submitted_by);
    self.store.list(&scope).await.map_err(Error::store)
  }

  /// One card, if `actor` can observe it through some read path. Cards the
  /// actor cannot see are reported as `NotFound`.
  pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<CardRecord> {
    self
      .store
      .get(id)
      .await
      .map_err(Error::store)?
      .filter(|card| self.policy.can_view(actor, card))
      .ok_or(Error::NotFound(id))
  }

  // ── Administration ────────────────────────────────────────────────────

  pub async fn submitters(&self, actor: &Actor) -> Result<Vec<SubmitterSummary>> {
    if !actor.is_admin() {
      return Err(Error::Unauthorized);
    }
    self.store.submitters().await.map_err(Error::store)
  }

  pub async fn count(&self, actor: &Actor, submitted_by: Option<&str>) -> Result<u64> {
    if !actor.is_admin() {
      return Err(Error::Unauthorized);
    }
    self.store.count(submitted_by).await.map_err(Error::store)
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::VecDeque, sync::Mutex, time::Duration};

  use tokio::sync::mpsc;

  use super::*;
  use crate::{
    actor::Role,
    card::{CardField, CardFields},
    dedup::DedupKey,
    export::SinkError,
    extract::{ExtractionError, ExtractionFailure, RawCard},
    testing::MemoryStore,
  };

  const LEAD: &str = "lead@example.com";

  fn service() -> CardService<MemoryStore> {
    CardService::new(MemoryStore::default(), AccessPolicy::new(LEAD))
  }

  fn alice() -> Actor { Actor::new("alice", Role::User) }
  fn bob() -> Actor { Actor::new("bob", Role::User) }
  fn admin() -> Actor { Actor::new("root", Role::Admin) }

  fn fields(email: &str, name: &str, company: &str) -> CardFields {
    CardFields {
      email: Some(email.into()),
      name: Some(name.into()),
      company: Some(company.into()),
      ..Default::default()
    }
  }

  fn normalized(f: CardFields) -> NormalizedCard { normalize(RawCard { fields: f }) }

  /// Replays a fixed list of extraction results.
  struct Scripted(Mutex<VecDeque<Result<RawCard, ExtractionError>>>);

  impl Scripted {
    fn new(items: Vec<Result<RawCard, ExtractionError>>) -> Self {
      Self(Mutex::new(items.into()))
    }
  }

  impl CardExtractor for Scripted {
    async fn extract(&self, _image: &CardImage) -> Result<RawCard, ExtractionError> {
      self.0.lock().unwrap().pop_front().expect("script exhausted")
    }
  }

  /// Reports every pushed card id on a channel.
  struct RecordingSink {
    pushed: mpsc::UnboundedSender<Uuid>,
    fail:   bool,
  }

  impl ExportSink for RecordingSink {
    async fn push(&self, card: &CardRecord) -> Result<(), SinkError> {
      let _ = self.pushed.send(card.id);
      if self.fail { Err("ledger offline".into()) } else { Ok(()) }
    }
  }

  /// A ledger that never answers.
  struct StalledSink;

  impl ExportSink for StalledSink {
    async fn push(&self, _card: &CardRecord) -> Result<(), SinkError> {
      std::future::pending().await
    }
  }

  fn image() -> CardImage {
    CardImage::new(vec![0xFF, 0xD8], "image/jpeg", Some("card.jpg".into())).unwrap()
  }

  #[tokio::test]
  async fn create_stores_unshared_card() {
    let svc = service();
    let card = svc
      .create(normalized(fields("x@y.com", "X Y", "Acme")), "alice", None)
      .await
      .unwrap();
    assert!(!card.shared);
    assert_eq!(card.submitted_by, "alice");
    assert_eq!(svc.store().count(None).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn duplicate_email_is_rejected_without_write() {
    let svc = service();
    svc
      .create(normalized(fields("x@y.com", "X Y", "Acme")), "alice", None)
      .await
      .unwrap();
    let err = svc
      .create(normalized(fields("X@Y.COM", "Other", "Globex")), "alice", None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Duplicate(DedupKey::Email)));
    assert_eq!(svc.store().count(None).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn concurrent_identical_submissions_store_once() {
    let svc = Arc::new(service());
    let mut handles = Vec::new();
    for _ in 0..8 {
      let svc = svc.clone();
      handles.push(tokio::spawn(async move {
        svc
          .create(normalized(fields("x@y.com", "X Y", "Acme")), "alice", None)
          .await
      }));
    }
    let mut stored = 0;
    for h in handles {
      if h.await.unwrap().is_ok() {
        stored += 1;
      }
    }
    assert_eq!(stored, 1);
    assert_eq!(svc.store().count(Some("alice")).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn submit_runs_pipeline_and_keeps_filename() {
    let svc = service();
    let extractor = Scripted::new(vec![Ok(RawCard {
      fields: fields(" X@Y.com ", "X Y", "Acme"),
    })]);
    let out = svc
      .submit(&extractor, &alice(), &image(), SubmitOptions::default())
      .await
      .unwrap();
    let Submission::Stored(card) = out else { panic!("expected stored card") };
    assert_eq!(card.fields.email.as_deref(), Some("x@y.com"));
    assert_eq!(card.original_filename.as_deref(), Some("card.jpg"));
  }

  #[tokio::test]
  async fn submit_extract_only_persists_nothing() {
    let svc = service();
    let extractor = Scripted::new(vec![Ok(RawCard { fields: fields("x@y.com", "X", "A") })]);
    let out = svc
      .submit(&extractor, &alice(), &image(), SubmitOptions { extract_only: true })
      .await
      .unwrap();
    assert!(matches!(out, Submission::Preview(_)));
    assert_eq!(svc.store().count(None).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn submit_surfaces_extraction_errors_and_empty_cards() {
    let svc = service();
    let failure = ExtractionError {
      kind:         ExtractionFailure::PermanentFailure,
      attempts:     1,
      status:       Some(400),
      detail:       "bad request".into(),
      raw_response: None,
    };
    let extractor = Scripted::new(vec![Err(failure.clone()), Ok(RawCard::default())]);
    let err = svc
      .submit(&extractor, &alice(), &image(), SubmitOptions::default())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Extraction(e) if e == failure));

    let err = svc
      .submit(&extractor, &alice(), &image(), SubmitOptions::default())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(svc.store().count(None).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn privileged_cards_are_exported_and_failures_swallowed() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let svc = CardService::with_sink(
      MemoryStore::default(),
      AccessPolicy::new(LEAD),
      RecordingSink { pushed: tx, fail: true },
    );
    svc
      .create(normalized(fields("a@b.com", "A", "B")), "alice", None)
      .await
      .unwrap();
    let lead = svc
      .create(normalized(fields("c@d.com", "C", "D")), LEAD, None)
      .await
      .unwrap();

    let pushed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
      .await
      .unwrap();
    assert_eq!(pushed, Some(lead.id));
    assert!(rx.try_recv().is_err());
    assert_eq!(svc.store().count(None).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn stalled_sink_does_not_hold_up_creation() {
    let svc = CardService::with_sink(
      MemoryStore::default(),
      AccessPolicy::new(LEAD),
      StalledSink,
    );
    let created = tokio::time::timeout(
      Duration::from_secs(5),
      svc.create(normalized(fields("c@d.com", "C", "D")), LEAD, None),
    )
    .await
    .expect("create waited on the export sink")
    .unwrap();
    assert_eq!(svc.store().get(created.id).await.unwrap(), Some(created));
  }

  #[tokio::test]
  async fn toggle_share_twice_restores_flag() {
    let svc = service();
    let card = svc
      .create(normalized(fields("x@y.com", "X", "A")), "alice", None)
      .await
      .unwrap();
    assert!(svc.toggle_share(&alice(), card.id).await.unwrap().shared);
    assert!(!svc.toggle_share(&alice(), card.id).await.unwrap().shared);
    assert!(!svc.get(&alice(), card.id).await.unwrap().shared);
  }

  #[tokio::test]
  async fn toggle_share_checks_ownership() {
    let svc = service();
    let card = svc
      .create(normalized(fields("x@y.com", "X", "A")), "alice", None)
      .await
      .unwrap();
    assert!(matches!(
      svc.toggle_share(&bob(), card.id).await,
      Err(Error::Unauthorized)
    ));
    assert!(svc.toggle_share(&admin(), card.id).await.unwrap().shared);
    assert!(matches!(
      svc.toggle_share(&admin(), Uuid::new_v4()).await,
      Err(Error::NotFound(_))
    ));
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_toggles_each_flip_once() {
    let svc = Arc::new(service());
    let card = svc
      .create(normalized(fields("x@y.com", "X", "A")), "alice", None)
      .await
      .unwrap();
    let id = card.id;

    let handles: Vec<_> = (0..50)
      .map(|_| {
        let svc = svc.clone();
        tokio::spawn(async move { svc.toggle_share(&alice(), id).await })
      })
      .collect();
    for h in handles {
      h.await.unwrap().unwrap();
    }

    assert!(!svc.get(&alice(), id).await.unwrap().shared);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_patches_of_different_fields_all_land() {
    let svc = Arc::new(service());
    let card = svc
      .create(normalized(fields("x@y.com", "X", "A")), "alice", None)
      .await
      .unwrap();
    let id = card.id;

    let patches = [
      (CardField::Phone, "+1 555 0100"),
      (CardField::Website, "https://acme.example"),
      (CardField::Address, "1 Main St"),
      (CardField::Designation, "CTO"),
    ];
    let handles: Vec<_> = patches
      .into_iter()
      .map(|(field, value)| {
        let svc = svc.clone();
        tokio::spawn(async move {
          let patch = CardPatch::default().set(field, Some(value));
          svc.update(&alice(), id, patch).await
        })
      })
      .collect();
    for h in handles {
      h.await.unwrap().unwrap();
    }

    let stored = svc.get(&alice(), id).await.unwrap();
    for (field, value) in patches {
      assert_eq!(stored.fields.get(field), Some(value), "{field} was lost");
    }
    assert_eq!(stored.fields.email.as_deref(), Some("x@y.com"));
  }

  #[tokio::test]
  async fn update_applies_normalized_patch() {
    let svc = service();
    let card = svc
      .create(normalized(fields("x@y.com", "X", "A")), "alice", None)
      .await
      .unwrap();
    let patch = CardPatch::default()
      .set(CardField::Email, Some(" New@Y.com "))
      .set(CardField::Company, None);
    let updated = svc.update(&alice(), card.id, patch).await.unwrap();
    assert_eq!(updated.fields.email.as_deref(), Some("new@y.com"));
    assert_eq!(updated.fields.company, None);
    assert_eq!(updated.id, card.id);
    assert_eq!(updated.created_at, card.created_at);
    assert_eq!(svc.get(&alice(), card.id).await.unwrap(), updated);
  }

  #[tokio::test]
  async fn update_reports_no_change_not_found_and_unauthorized() {
    let svc = service();
    let card = svc
      .create(normalized(fields("x@y.com", "X", "A")), "alice", None)
      .await
      .unwrap();
    let same = CardPatch::default().set(CardField::Name, Some("  X "));
    assert!(matches!(
      svc.update(&alice(), card.id, same).await,
      Err(Error::NoChange(_))
    ));
    let patch = CardPatch::default().set(CardField::Phone, Some("1"));
    assert!(matches!(
      svc.update(&alice(), Uuid::new_v4(), patch.clone()).await,
      Err(Error::NotFound(_))
    ));
    assert!(matches!(
      svc.update(&bob(), card.id, patch).await,
      Err(Error::Unauthorized)
    ));
  }

  #[tokio::test]
  async fn delete_is_permanent() {
    let svc = service();
    let card = svc
      .create(normalized(fields("x@y.com", "X", "A")), "alice", None)
      .await
      .unwrap();
    assert!(matches!(svc.delete(&bob(), card.id).await, Err(Error::Unauthorized)));
    svc.delete(&alice(), card.id).await.unwrap();
    assert!(matches!(svc.delete(&alice(), card.id).await, Err(Error::NotFound(_))));
    assert!(matches!(svc.get(&admin(), card.id).await, Err(Error::NotFound(_))));
  }

  #[tokio::test]
  async fn hidden_cards_read_as_not_found() {
    let svc = service();
    let card = svc
      .create(normalized(fields("x@y.com", "X", "A")), "alice", None)
      .await
      .unwrap();
    assert!(matches!(svc.get(&bob(), card.id).await, Err(Error::NotFound(_))));
    assert!(svc.get(&admin(), card.id).await.is_ok());
  }

  #[tokio::test]
  async fn admin_only_summaries() {
    let svc = service();
    svc
      .create(normalized(fields("x@y.com", "X", "A")), "alice", None)
      .await
      .unwrap();
    assert!(matches!(svc.submitters(&alice()).await, Err(Error::Unauthorized)));
    let rows = svc.submitters(&admin()).await.unwrap();
    assert_eq!(rows, vec![SubmitterSummary { identity: "alice".into(), cards: 1 }]);
    assert_eq!(svc.count(&admin(), Some("bob")).await.unwrap(), 0);
  }
}
