//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Malformed or invalid input; nothing was written.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// Missing, unknown, or inactive device credential.
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  /// Missing or wrong admin credentials; answered with a Basic challenge.
  #[error("authentication required")]
  AuthRequired,

  /// The credential is valid but does not match the declared device.
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// A batch could not be written. Safe to retry with the same ids.
  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized(_) | ApiError::AuthRequired => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// A failure computing a window from the server clock and the configured
  /// zone. Nothing the caller sent caused it, so it is a 500.
  pub fn clock(e: gatelog_core::Error) -> Self { ApiError::Store(Box::new(e)) }
}

impl From<gatelog_core::Error> for ApiError {
  fn from(e: gatelog_core::Error) -> Self { ApiError::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::BadRequest(m)
      | ApiError::Unauthorized(m)
      | ApiError::Forbidden(m)
      | ApiError::NotFound(m)
      | ApiError::Unavailable(m) => m.clone(),
      ApiError::AuthRequired => "authentication required".to_owned(),
      ApiError::Store(e) => e.to_string(),
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if matches!(self, ApiError::AuthRequired) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"gatelog\""),
      );
    }
    res
  }
}
