//! HTTP Basic authentication against per-user argon2 hashes.
//!
//! The username is the account email. A verified request carries a
//! [`Requester`] extension for the API handlers downstream.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;
use rivalry_api::Requester;
use rivalry_core::{clock::Clock, store::RivalStore};

use crate::{AppState, error::Error};

/// Accounts are keyed by their trimmed, lowercased email.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

/// Produce an argon2 PHC string for `password` with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

/// Check `password` against a stored PHC string.
pub fn verify_password(password: &str, phc: &str) -> Result<(), Error> {
  let parsed_hash = PasswordHash::new(phc).map_err(|_| Error::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)
}

/// Pull `(username, password)` out of an `Authorization: Basic` header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Middleware: authenticate the request or answer 401.
pub async fn require_auth<S, C>(
  State(state): State<AppState<S, C>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error>
where
  S: RivalStore + 'static,
  C: Clock + 'static,
{
  let (email, password) = basic_credentials(req.headers())?;
  let email = normalize_email(&email);

  let user = state
    .tracker
    .store()
    .find_user_by_email(&email)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or_else(|| {
      tracing::debug!(%email, "login for unknown account");
      Error::Unauthorized
    })?;
  verify_password(&password, &user.password_hash)?;

  req.extensions_mut().insert(Requester(user.user_id));
  Ok(next.run(req).await)
}
