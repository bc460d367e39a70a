//! JSON REST API for Rolo.
//!
//! Exposes an axum [`Router`] backed by a [`CardService`] and any
//! [`CardExtractor`]. Authentication happens upstream: the proxy in front of
//! the server supplies the actor through the `x-rolo-*` headers read by
//! [`identity::Identified`]. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(rolo_api::api_router(state))
//! ```

pub mod admin;
pub mod cards;
pub mod error;
pub mod identity;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use rolo_core::{
  export::ExportSink, extract::CardExtractor, lifecycle::CardService,
  store::CardStore,
};

pub use error::ApiError;

/// Largest accepted card photograph.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, X, K> {
  pub cards:     Arc<CardService<S, K>>,
  pub extractor: Arc<X>,
}

impl<S, X, K> AppState<S, X, K> {
  pub fn new(cards: CardService<S, K>, extractor: X) -> Self {
    Self { cards: Arc::new(cards), extractor: Arc::new(extractor) }
  }
}

// Derived `Clone` would demand `S: Clone` etc.; only the `Arc`s are cloned.
impl<S, X, K> Clone for AppState<S, X, K> {
  fn clone(&self) -> Self {
    Self { cards: self.cards.clone(), extractor: self.extractor.clone() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S, X, K>(state: AppState<S, X, K>) -> Router<()>
where
  S: CardStore + 'static,
  X: CardExtractor + 'static,
  K: ExportSink + 'static,
{
  Router::new()
    // Cards
    .route("/cards", get(cards::list::<S, X, K>).post(cards::submit::<S, X, K>))
    .route("/cards/personal", get(cards::personal::<S, X, K>))
    .route(
      "/cards/{id}",
      get(cards::get_one::<S, X, K>)
        .patch(cards::update::<S, X, K>)
        .delete(cards::delete::<S, X, K>),
    )
    .route("/cards/{id}/share", post(cards::toggle_share::<S, X, K>))
    // Export
    .route("/export", get(cards::export::<S, X, K>))
    // Administration
    .route("/admin/submitters", get(admin::submitters::<S, X, K>))
    .route("/admin/count", get(admin::count::<S, X, K>))
    .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
    .with_state(state)
}
