//! The authenticated caller, as attached by the transport layer.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

/// Id of the user making the request.
///
/// Whatever authenticates the request inserts this into the request
/// extensions; handlers that take a `Requester` reject the request with 401
/// when it is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester(pub Uuid);

impl<S> FromRequestParts<S> for Requester
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Requester>()
      .copied()
      .ok_or(ApiError::Unauthorized)
  }
}
