//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Refusals that a client can act on (full session, closed window, stale
//! capacity edit) all map to 409 with a machine-readable `error` code in the
//! body; transient write contention maps to 503 with `Retry-After` so
//! well-behaved clients retry instead of giving up.

use axum::{
  Json,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or malformed {0} header")]
  MissingIdentity(&'static str),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] roster_core::Error),
}

impl ApiError {
  fn status_and_code(&self) -> (StatusCode, &'static str) {
    use roster_core::Error as Core;

    match self {
      ApiError::MissingIdentity(_) => (StatusCode::UNAUTHORIZED, "missing_identity"),
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      ApiError::Core(e) => match e {
        Core::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
        Core::CapacityExceeded { .. } => (StatusCode::CONFLICT, "capacity_exceeded"),
        Core::SessionNotJoinable { .. } => (StatusCode::CONFLICT, "session_not_joinable"),
        Core::CapacityBelowUsage { .. } => (StatusCode::CONFLICT, "capacity_below_usage"),
        Core::InvalidCapacity(_) => (StatusCode::BAD_REQUEST, "invalid_capacity"),
        Core::Conflict(_) => (StatusCode::SERVICE_UNAVAILABLE, "contention"),
        Core::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.status_and_code();
    let message = self.to_string();

    let mut resp =
      (status, Json(json!({ "error": code, "message": message }))).into_response();

    if status == StatusCode::SERVICE_UNAVAILABLE {
      // The losing writer rolled back cleanly; an immediate retry is safe.
      resp
        .headers_mut()
        .insert(header::RETRY_AFTER, header::HeaderValue::from_static("0"));
    }
    resp
  }
}
