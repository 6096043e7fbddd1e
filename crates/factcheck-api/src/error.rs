//! API error type and [`axum::response::IntoResponse`] implementation.

use std::collections::BTreeMap;

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use factcheck_core::{DomainError, workflow::ValidationErrors};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("authentication required")]
  Unauthorized,

  #[error("not authorized to perform this action")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a store error, recovering the domain error it carries if any.
  pub fn from_store<E>(e: E) -> Self
  where
    E: std::error::Error + DomainError + Send + Sync + 'static,
  {
    match e.domain() {
      Some(factcheck_core::Error::Validation(errors)) => ApiError::Validation(errors.clone()),
      Some(factcheck_core::Error::NotAuthorized) => ApiError::Forbidden,
      Some(factcheck_core::Error::NotFound { entity, id }) => {
        ApiError::NotFound(format!("{entity} {id} not found"))
      }
      Some(factcheck_core::Error::Configuration(message)) => {
        tracing::error!(%message, "configuration error");
        ApiError::Store(Box::new(e))
      }
      _ => ApiError::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthorized => {
        let body = Json(json!({ "error": self.to_string() }));
        let mut res = (StatusCode::UNAUTHORIZED, body).into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"factcheck\""),
        );
        res
      }
      ApiError::Validation(errors) => {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for e in &errors.0 {
          fields.entry(e.field.to_string()).or_default().push(e.message.clone());
        }
        let body = json!({ "error": errors.to_string(), "fields": fields });
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
      }
      ApiError::Forbidden => {
        (StatusCode::FORBIDDEN, Json(json!({ "error": self.to_string() }))).into_response()
      }
      ApiError::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
      }
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Store(e) => {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() })))
          .into_response()
      }
    }
  }
}
