//! Handlers for `/chat`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/chat` | Latest messages of the caller's rival code, oldest first |
//! | `POST` | `/chat` | Body: `{"body":"..."}`; 400 if blank |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use rivalry_core::{
  chat::ChatEntry,
  clock::Clock,
  store::RivalStore,
  tracker::Tracker,
};
use serde::Deserialize;

use crate::{error::ApiError, requester::Requester};

/// `GET /chat`
pub async fn history<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(user_id): Requester,
) -> Result<Json<Vec<ChatEntry>>, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  Ok(Json(tracker.chat_history(user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SendBody {
  pub body: String,
}

/// `POST /chat`
pub async fn send<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(user_id): Requester,
  Json(input): Json<SendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  let message = tracker.record_chat_message(user_id, &input.body).await?;
  Ok((StatusCode::CREATED, Json(message)))
}
