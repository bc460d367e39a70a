//! Handlers for `/cards` and `/export`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/cards` | Body: image bytes; `Content-Type` `image/jpeg` or `image/png`; optional `?filename=..&extract_only=true` |
//! | `GET`    | `/cards` | General listing; `?submitted_by=` narrows admin listings |
//! | `GET`    | `/cards/personal` | The actor's own cards |
//! | `GET`    | `/cards/{id}` | 404 unless visible to the actor |
//! | `PATCH`  | `/cards/{id}` | Body: partial JSON object of card fields |
//! | `DELETE` | `/cards/{id}` | 204 on success |
//! | `POST`   | `/cards/{id}/share` | Flips `shared` |
//! | `GET`    | `/export` | General listing as a JSON attachment |

use axum::{
  Json,
  body::Bytes,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use rolo_core::{
  card::{CardImage, CardPatch, CardRecord},
  export::ExportSink,
  extract::CardExtractor,
  lifecycle::{SubmitOptions, Submission},
  store::CardStore,
  visibility::ReadPath,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError, identity::Identified};

// ─── Submit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
  pub filename:     Option<String>,
  #[serde(default)]
  pub extract_only: bool,
}

/// `POST /cards`, body: the card photograph.
///
/// Responds `201` with the stored card, or `200` with the would-be fields in
/// extract-only mode.
pub async fn submit<S, X, K>(
  State(state): State<AppState<S, X, K>>,
  Identified(actor): Identified,
  Query(params): Query<SubmitParams>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Response, ApiError>
where
  S: CardStore,
  X: CardExtractor,
  K: ExportSink,
{
  let media_type = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default();
  let image = CardImage::new(body.to_vec(), media_type, params.filename)?;

  let options = SubmitOptions { extract_only: params.extract_only };
  let submission = state
    .cards
    .submit(state.extractor.as_ref(), &actor, &image, options)
    .await?;

  let status = match submission {
    Submission::Stored(_) => StatusCode::CREATED,
    Submission::Preview(_) => StatusCode::OK,
  };
  Ok((status, Json(submission)).into_response())
}

// ─── Listings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub submitted_by: Option<String>,
}

/// `GET /cards[?submitted_by=<identity>]`
pub async fn list<S, X, K>(
  State(state): State<AppState<S, X, K>>,
  Identified(actor): Identified,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CardRecord>>, ApiError>
where
  S: CardStore,
  K: ExportSink,
{
  let cards = state
    .cards
    .list(&actor, ReadPath::General, params.submitted_by.as_deref())
    .await?;
  Ok(Json(cards))
}

/// `GET /cards/personal`
pub async fn personal<S, X, K>(
  State(state): State<AppState<S, X, K>>,
  Identified(actor): Identified,
) -> Result<Json<Vec<CardRecord>>, ApiError>
where
  S: CardStore,
  K: ExportSink,
{
  let cards = state.cards.list(&actor, ReadPath::Personal, None).await?;
  Ok(Json(cards))
}

/// `GET /export[?submitted_by=<identity>]`
pub async fn export<S, X, K>(
  State(state): State<AppState<S, X, K>>,
  Identified(actor): Identified,
  Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CardStore,
  K: ExportSink,
{
  let cards = state
    .cards
    .list(&actor, ReadPath::Export, params.submitted_by.as_deref())
    .await?;
  Ok((
    [(header::CONTENT_DISPOSITION, "attachment; filename=\"cards.json\"")],
    Json(cards),
  ))
}

// ─── Single card ──────────────────────────────────────────────────────────────

/// `GET /cards/{id}`
pub async fn get_one<S, X, K>(
  State(state): State<AppState<S, X, K>>,
  Identified(actor): Identified,
  Path(id): Path<Uuid>,
) -> Result<Json<CardRecord>, ApiError>
where
  S: CardStore,
  K: ExportSink,
{
  Ok(Json(state.cards.get(&actor, id).await?))
}

/// `PATCH /cards/{id}`, body: `{"company": "Acme", "phone": null, ...}`
pub async fn update<S, X, K>(
  State(state): State<AppState<S, X, K>>,
  Identified(actor): Identified,
  Path(id): Path<Uuid>,
  Json(body): Json<serde_json::Value>,
) -> Result<Json<CardRecord>, ApiError>
where
  S: CardStore,
  K: ExportSink,
{
  let patch = CardPatch::from_json(body)?;
  Ok(Json(state.cards.update(&actor, id, patch).await?))
}

/// `DELETE /cards/{id}`
pub async fn delete<S, X, K>(
  State(state): State<AppState<S, X, K>>,
  Identified(actor): Identified,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CardStore,
  K: ExportSink,
{
  state.cards.delete(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct ShareState {
  pub id:     Uuid,
  pub shared: bool,
}

/// `POST /cards/{id}/share`
pub async fn toggle_share<S, X, K>(
  State(state): State<AppState<S, X, K>>,
  Identified(actor): Identified,
  Path(id): Path<Uuid>,
) -> Result<Json<ShareState>, ApiError>
where
  S: CardStore,
  K: ExportSink,
{
  let card = state.cards.toggle_share(&actor, id).await?;
  Ok(Json(ShareState { id: card.id, shared: card.shared }))
}
