//! Error types for `factcheck-core`.

use thiserror::Error;

use crate::workflow::ValidationErrors;

#[derive(Debug, Error)]
pub enum Error {
  /// A status transition or a required field was rejected by the validator.
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  /// The acting user may not make the staged changes.
  #[error("not authorized to perform this action")]
  NotAuthorized,

  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: i64 },

  /// Stored data outside the known domain, e.g. an unknown evaluation status.
  /// Never a user mistake.
  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn not_found(entity: &'static str, id: i64) -> Self {
    Self::NotFound { entity, id }
  }
}

/// Implemented by backend error types so that callers can recover the domain
/// error (validation, authorization, lookup) from a storage failure.
pub trait DomainError {
  fn domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
