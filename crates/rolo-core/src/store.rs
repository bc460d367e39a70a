//! The `CardStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `rolo-store-sqlite`).
//! The lifecycle manager and the HTTP layer depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  card::{CardPatch, CardRecord, NewCard},
  dedup::DedupKeys,
  visibility::CardScope,
};

/// One row of the administrative "who submitted what" summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitterSummary {
  pub identity: String,
  pub cards:    u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Rolo card store backend.
///
/// Writes are single-row and atomic: an insert either stores the full card
/// with a fresh id or stores nothing, and concurrent field updates or share
/// toggles on one card never overwrite each other.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new, unshared card. The store assigns `id` and `created_at`.
  fn insert(
    &self,
    card: NewCard,
  ) -> impl Future<Output = Result<CardRecord, Self::Error>> + Send + '_;

  /// Replace only the fields named in `patch`, leave the rest as stored, and
  /// recompute the comparison keys from the merged card. The read and the
  /// write are one atomic step. Returns `None` if `id` does not resolve.
  fn update_fields<'a>(
    &'a self,
    id: Uuid,
    patch: &'a CardPatch,
  ) -> impl Future<Output = Result<Option<CardRecord>, Self::Error>> + Send + 'a;

  /// Atomically flip the `shared` flag and return the new value. Returns
  /// `None` if `id` does not resolve.
  fn toggle_shared(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<bool>, Self::Error>> + Send + '_;

  /// Remove a card permanently. Returns `false` if `id` does not resolve.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a card by id. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CardRecord>, Self::Error>> + Send + '_;

  /// All cards matching `scope`, oldest first.
  fn list<'a>(
    &'a self,
    scope: &'a CardScope,
  ) -> impl Future<Output = Result<Vec<CardRecord>, Self::Error>> + Send + 'a;

  /// Any card by `submitted_by` that collides with `keys` under one of the
  /// duplicate rules (see [`crate::dedup`]). Absent keys match nothing.
  fn find_duplicate<'a>(
    &'a self,
    submitted_by: &'a str,
    keys: &'a DedupKeys,
  ) -> impl Future<Output = Result<Option<CardRecord>, Self::Error>> + Send + 'a;

  /// Number of cards, optionally restricted to one submitter.
  fn count<'a>(
    &'a self,
    submitted_by: Option<&'a str>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Distinct submitters with their card counts, ordered by identity.
  fn submitters(
    &self,
  ) -> impl Future<Output = Result<Vec<SubmitterSummary>, Self::Error>> + Send + '_;
}
