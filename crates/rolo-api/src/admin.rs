//! Handlers for `/admin` endpoints. Admin role only; everyone else gets `403`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/admin/submitters` | `[{"identity": .., "cards": n}]` ordered by identity |
//! | `GET` | `/admin/count` | `{"count": n}`; optional `?submitted_by=` |

use axum::{
  Json,
  extract::{Query, State},
};
use rolo_core::{
  export::ExportSink,
  store::{CardStore, SubmitterSummary},
};
use serde::Serialize;

use crate::{AppState, cards::ListParams, error::ApiError, identity::Identified};

/// `GET /admin/submitters`
pub async fn submitters<S, X, K>(
  State(state): State<AppState<S, X, K>>,
  Identified(actor): Identified,
) -> Result<Json<Vec<SubmitterSummary>>, ApiError>
where
  S: CardStore,
  K: ExportSink,
{
  Ok(Json(state.cards.submitters(&actor).await?))
}

#[derive(Debug, Serialize)]
pub struct CardCount {
  pub count: u64,
}

/// `GET /admin/count[?submitted_by=<identity>]`
pub async fn count<S, X, K>(
  State(state): State<AppState<S, X, K>>,
  Identified(actor): Identified,
  Query(params): Query<ListParams>,
) -> Result<Json<CardCount>, ApiError>
where
  S: CardStore,
  K: ExportSink,
{
  let count = state
    .cards
    .count(&actor, params.submitted_by.as_deref())
    .await?;
  Ok(Json(CardCount { count }))
}
