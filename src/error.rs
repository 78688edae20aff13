//! Error taxonomy for the HTTP surface.
//!
//! Domain rejections (wrong answer, empty submission) are NOT errors: they
//! travel as `SubmissionOutcome` values and become `success: false` payloads.
//! `ApiError` covers everything that maps to a non-2xx status code.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Storage-layer failures. `Duplicate` is split out so callers can map a
/// unique-constraint violation to a user-facing conflict instead of a 500.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("duplicate record")]
  Duplicate,
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Username or email already exists")]
  Conflict,
  #[error("Invalid username or password")]
  BadCredentials,
  #[error("Missing or invalid credentials")]
  Unauthorized,
  #[error("Level not found")]
  LevelNotFound,
  /// Infrastructure failure; details are logged, never leaked to the client.
  #[error("Database error")]
  Storage(#[from] StoreError),
  #[error("Server error")]
  Auth(String),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Conflict | ApiError::BadCredentials => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::LevelNotFound => StatusCode::NOT_FOUND,
      ApiError::Storage(_) | ApiError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    match &self {
      ApiError::Storage(e) => {
        error!(target: "codequest_backend", error = %e, "Storage failure surfaced to client");
      }
      ApiError::Auth(msg) => {
        error!(target: "codequest_backend", error = %msg, "Auth internals failure surfaced to client");
      }
      _ => {}
    }

    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
