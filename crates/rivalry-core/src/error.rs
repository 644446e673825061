//! Error types for `rivalry-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("item not found: {0}")]
  ItemNotFound(Uuid),

  #[error("user {0} has no rival yet")]
  RivalNotFound(Uuid),

  #[error("no users share rival code {0:?}")]
  PairingNotFound(String),

  #[error("rival code {0:?} already has two members")]
  PairingFull(String),

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("invalid achievement catalog: {0}")]
  InvalidCatalog(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
