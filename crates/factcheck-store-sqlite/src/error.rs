//! Error type for `factcheck-store-sqlite`.

use factcheck_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Validation, authorization, lookup and configuration failures.
  #[error(transparent)]
  Core(#[from] factcheck_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
    Self::Core(factcheck_core::Error::not_found(entity, id))
  }

  pub(crate) fn configuration(message: impl Into<String>) -> Self {
    Self::Core(factcheck_core::Error::Configuration(message.into()))
  }
}

impl DomainError for Error {
  fn domain(&self) -> Option<&factcheck_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
