//! JSON HTTP API for the factcheck editorial back end.
//!
//! Exposes an axum [`Router`] backed by any
//! [`factcheck_core::store::EditorialStore`]. Callers authenticate with HTTP
//! Basic (e-mail and password); TLS and request tracing are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", factcheck_api::router(state))
//! ```

pub mod auth;
pub mod error;
pub mod extract;
pub mod lookups;
pub mod statements;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, put},
};
use factcheck_core::{alert::ChatSink, store::EditorialStore};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:          Arc<S>,
  /// Where proofreading alerts are posted.
  pub alerts:         Arc<dyn ChatSink>,
  /// Base URL of the admin UI, used in alert links.
  pub admin_base_url: Arc<str>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, alerts: Arc<dyn ChatSink>, admin_base_url: impl Into<Arc<str>>) -> Self {
    Self { store, alerts, admin_base_url: admin_base_url.into() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn router<S>(state: AppState<S>) -> Router<()>
where
  S: EditorialStore + Clone + 'static,
{
  Router::new()
    // Statements
    .route(
      "/statements",
      get(statements::list::<S>).post(statements::create::<S>),
    )
    .route(
      "/statements/{id}",
      get(statements::get_one::<S>)
        .patch(statements::update::<S>)
        .delete(statements::discard::<S>),
    )
    .route("/sources/{id}/statement-order", put(statements::reorder::<S>))
    // Lookups
    .route("/veracities", get(lookups::veracities::<S>))
    .route("/promise-ratings", get(lookups::promise_ratings::<S>))
    .route("/speakers/{id}/stats", get(lookups::speaker_stats::<S>))
    .route("/notifications", get(lookups::notifications::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
