//! Handlers for statement endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/statements` | `?scope`, `source_id`, `speaker_id`; `ordered` needs auth |
//! | `POST`   | `/statements` | `statements:add`; returns 201 + record |
//! | `GET`    | `/statements/{id}` | Unpublished statements need auth; any signed-in user may read them |
//! | `PATCH`  | `/statements/{id}` | Body: [`StatementUpdate`] |
//! | `DELETE` | `/statements/{id}` | `statements:delete`; soft delete |
//! | `PUT`    | `/sources/{id}/statement-order` | `statements:sort` |
//!
//! Evaluations the caller may not see are redacted from every payload. Reading
//! an unpublished statement takes no permission beyond signing in: every
//! account belongs to the newsroom, and the evaluation itself stays redacted
//! until [`can_view_evaluation`] allows it.
//!
//! Malformed bodies, query strings and ids answer 400 with a JSON error.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use factcheck_core::{
  alert::proofreading_alert,
  authz::can_view_evaluation,
  statement::NewStatement,
  store::{EditorialStore, StatementQuery, StatementRecord},
  update::StatementUpdate,
  user::{Permission, User},
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{CurrentUser, MaybeUser},
  error::ApiError,
  extract::{JsonBody, PathParam, QueryParams},
};

/// `record` as `viewer` may see it.
fn present(record: StatementRecord, viewer: Option<&User>) -> StatementRecord {
  if can_view_evaluation(viewer, &record.assessment) {
    return record;
  }
  StatementRecord { assessment: record.assessment.redacted(), ..record }
}

fn require(user: &User, permission: Permission) -> Result<(), ApiError> {
  if user.has(permission) { Ok(()) } else { Err(ApiError::Forbidden) }
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /statements[?scope=…][&source_id=…][&speaker_id=…]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  MaybeUser(viewer): MaybeUser,
  QueryParams(query): QueryParams<StatementQuery>,
) -> Result<Json<Vec<StatementRecord>>, ApiError>
where
  S: EditorialStore + Clone + 'static,
{
  if !query.scope.is_public() && viewer.is_none() {
    return Err(ApiError::Unauthorized);
  }

  let records = state
    .store
    .list_statements(&query)
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(
    records
      .into_iter()
      .map(|r| present(r, viewer.as_ref()))
      .collect(),
  ))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /statements/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  MaybeUser(viewer): MaybeUser,
  PathParam(id): PathParam<i64>,
) -> Result<Json<StatementRecord>, ApiError>
where
  S: EditorialStore + Clone + 'static,
{
  let record = state
    .store
    .get_statement(id)
    .await
    .map_err(ApiError::from_store)?
    .filter(|r| viewer.is_some() || r.statement.published)
    .ok_or_else(|| ApiError::NotFound(format!("statement {id} not found")))?;

  Ok(Json(present(record, viewer.as_ref())))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /statements`, returns 201 + the stored record.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  JsonBody(body): JsonBody<NewStatement>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EditorialStore + Clone + 'static,
{
  require(&user, Permission::StatementsAdd)?;

  let record = state
    .store
    .create_statement(body)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(statement = record.statement.id, user = user.id, "statement created");

  Ok((StatusCode::CREATED, Json(present(record, Some(&user)))))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
  pub statement:             StatementRecord,
  pub notifications_created: usize,
}

/// `PATCH /statements/{id}`
///
/// After the update commits, every fifth statement of a source entering
/// proofreading triggers a chat alert.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  PathParam(id): PathParam<i64>,
  JsonBody(body): JsonBody<StatementUpdate>,
) -> Result<Json<UpdateResponse>, ApiError>
where
  S: EditorialStore + Clone + 'static,
{
  let outcome = state
    .store
    .update_statement(id, body, user.id)
    .await
    .map_err(ApiError::from_store)?;

  if let Some(queue) = &outcome.proofreading_queue
    && let Some(text) = proofreading_alert(queue, &state.admin_base_url)
  {
    tracing::info!(source = queue.source_id, pending = queue.pending, "proofreading alert");
    state.alerts.post(text);
  }

  Ok(Json(UpdateResponse {
    statement:             present(outcome.record, Some(&user)),
    notifications_created: outcome.notifications_created,
  }))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /statements/{id}`
pub async fn discard<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError>
where
  S: EditorialStore + Clone + 'static,
{
  require(&user, Permission::StatementsDelete)?;
  state
    .store
    .discard_statement(id)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(statement = id, user = user.id, "statement discarded");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Reorder ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
  /// New order; `null` clears every position in the source.
  pub statement_ids: Option<Vec<i64>>,
}

/// `PUT /sources/{id}/statement-order`
pub async fn reorder<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  PathParam(source_id): PathParam<i64>,
  JsonBody(body): JsonBody<ReorderBody>,
) -> Result<StatusCode, ApiError>
where
  S: EditorialStore + Clone + 'static,
{
  require(&user, Permission::StatementsSort)?;
  state
    .store
    .reorder_source_statements(source_id, body.statement_ids)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
