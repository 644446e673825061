//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("conflict: {0}")]
  Conflict(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("invalid configuration: {0}")]
  Config(String),
  #[error("password hashing failed: {0}")]
  Hash(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<rivalry_core::Error> for Error {
  fn from(e: rivalry_core::Error) -> Self {
    use rivalry_core::Error as E;
    match e {
      E::PairingFull(_) | E::EmailTaken(_) => Self::Conflict(e.to_string()),
      E::Validation(m) => Self::BadRequest(m),
      E::InvalidCatalog(m) => Self::Config(m),
      E::Store(inner) => Self::Store(inner),
      other => Self::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match &self {
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::Conflict(_) => StatusCode::CONFLICT,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::Config(_) | Error::Hash(_) | Error::Store(_) => {
        tracing::error!(error = %self, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let mut res =
      (status, Json(json!({ "error": self.to_string() }))).into_response();
    if matches!(self, Error::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"rivalry\""),
      );
    }
    res
  }
}
