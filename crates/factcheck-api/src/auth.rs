//! HTTP Basic-auth extractors backed by the user table.
//!
//! Credentials are `email:password`; the password is verified against the
//! user's argon2 PHC hash. Inactive users and users without a password cannot
//! sign in.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use factcheck_core::{store::EditorialStore, user::User};

use crate::{AppState, error::ApiError};

/// The authenticated caller. Rejects the request with 401 when credentials
/// are missing or wrong.
pub struct CurrentUser(pub User);

/// The caller if credentials were sent. Anonymous requests pass through;
/// wrong credentials are still rejected.
pub struct MaybeUser(pub Option<User>);

fn credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let value = value.to_str().map_err(|_| ApiError::Unauthorized)?;
  let encoded = value.strip_prefix("Basic ").ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;
  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  Ok(Some((email.to_owned(), password.to_owned())))
}

/// Verify `password` against a stored PHC string.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  PasswordHash::new(password_hash)
    .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    .unwrap_or(false)
}

async fn authenticate<S>(headers: &HeaderMap, store: &S) -> Result<Option<User>, ApiError>
where
  S: EditorialStore,
{
  let Some((email, password)) = credentials(headers)? else {
    return Ok(None);
  };

  let user = store
    .find_user_by_email(&email)
    .await
    .map_err(ApiError::from_store)?
    .filter(|u| u.active)
    .ok_or(ApiError::Unauthorized)?;

  let verified = user
    .password_hash
    .as_deref()
    .is_some_and(|hash| verify_password(&password, hash));
  if !verified {
    tracing::debug!(%email, "rejected credentials");
    return Err(ApiError::Unauthorized);
  }

  Ok(Some(user))
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: EditorialStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, state.store.as_ref())
      .await?
      .map(CurrentUser)
      .ok_or(ApiError::Unauthorized)
  }
}

impl<S> FromRequestParts<AppState<S>> for MaybeUser
where
  S: EditorialStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeUser(authenticate(&parts.headers, state.store.as_ref()).await?))
  }
}

#[cfg(test)]
mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::http::HeaderValue;
  use rand_core::OsRng;

  use super::*;

  fn basic(user: &str, pass: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = format!("Basic {}", B64.encode(format!("{user}:{pass}")));
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
    headers
  }

  #[test]
  fn missing_header_is_anonymous() {
    assert!(credentials(&HeaderMap::new()).unwrap().is_none());
  }

  #[test]
  fn basic_credentials_are_decoded() {
    let (email, password) = credentials(&basic("eva@example.com", "s3:cret")).unwrap().unwrap();
    assert_eq!(email, "eva@example.com");
    assert_eq!(password, "s3:cret");
  }

  #[test]
  fn other_schemes_are_rejected() {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert!(matches!(credentials(&headers), Err(ApiError::Unauthorized)));
  }

  #[test]
  fn password_verification() {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(b"secret", &salt)
      .unwrap()
      .to_string();
    assert!(verify_password("secret", &hash));
    assert!(!verify_password("wrong", &hash));
    assert!(!verify_password("secret", "not a hash"));
  }
}
