//! HTTP Basic-auth guard for the reporting endpoints.
//!
//! When no admin credentials are configured the guard lets every request
//! through; the server is then expected to sit behind another access layer.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use gatelog_core::store::EventStore;
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// Credentials accepted for the reporting endpoints.
#[derive(Clone)]
pub struct AdminCredentials {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Zero-size marker: present in the handler means the request may read
/// reports.
pub struct Admin;

/// Produce the argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

/// Verify Basic credentials in `headers` against `creds`.
pub fn verify_basic(headers: &HeaderMap, creds: &AdminCredentials) -> Result<(), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::AuthRequired)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::AuthRequired)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::AuthRequired)?;
  let pair = std::str::from_utf8(&decoded).map_err(|_| ApiError::AuthRequired)?;

  let (username, password) = pair.split_once(':').ok_or(ApiError::AuthRequired)?;

  if username != creds.username {
    return Err(ApiError::AuthRequired);
  }

  let parsed_hash =
    PasswordHash::new(&creds.password_hash).map_err(|_| ApiError::AuthRequired)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::AuthRequired)?;

  Ok(())
}

impl<S> FromRequestParts<AppState<S>> for Admin
where
  S: EventStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    if let Some(creds) = &state.settings.admin {
      verify_basic(&parts.headers, creds)?;
    }
    Ok(Admin)
  }
}
