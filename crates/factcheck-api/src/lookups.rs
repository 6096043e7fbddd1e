//! Read-only endpoints: rating scales, speaker statistics and the caller's
//! notifications.

use axum::{Json, extract::State};
use factcheck_core::{
  assessment::{PromiseRating, Veracity},
  notification::Notification,
  store::{EditorialStore, SpeakerStats},
};

use crate::{AppState, auth::CurrentUser, error::ApiError, extract::PathParam};

/// `GET /veracities`
pub async fn veracities<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Veracity>>, ApiError>
where
  S: EditorialStore + Clone + 'static,
{
  let rows = state.store.list_veracities().await.map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

/// `GET /promise-ratings`
pub async fn promise_ratings<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<PromiseRating>>, ApiError>
where
  S: EditorialStore + Clone + 'static,
{
  let rows = state
    .store
    .list_promise_ratings()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

/// `GET /speakers/{id}/stats`: veracity counts over the statements relevant
/// for statistics. Public, since only published approved statements count.
pub async fn speaker_stats<S>(
  State(state): State<AppState<S>>,
  PathParam(speaker_id): PathParam<i64>,
) -> Result<Json<SpeakerStats>, ApiError>
where
  S: EditorialStore + Clone + 'static,
{
  let stats = state
    .store
    .speaker_stats(speaker_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(stats))
}

/// `GET /notifications`, newest first.
pub async fn notifications<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Notification>>, ApiError>
where
  S: EditorialStore + Clone + 'static,
{
  let rows = state
    .store
    .notifications_for(user.id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}
