//! Handlers for `/items` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/items` | Optional `?kind=lecture\|practice_set\|school_lesson` |
//! | `POST`   | `/items` | Body: a [`NewItem`] |
//! | `DELETE` | `/items/{id}` | 404 if not found |
//! | `PATCH`  | `/items/{id}/toggle` | Required `?kind=`; 404 if the kind does not match |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rivalry_core::{
  clock::Clock,
  item::{ItemKind, ItemStatus, NewItem},
  store::RivalStore,
  tracker::{ToggleResult, Tracker},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, requester::Requester};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind: Option<ItemKind>,
}

/// `GET /items[?kind=<kind>]`
pub async fn list<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(user_id): Requester,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ItemStatus>>, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  let items = tracker.list_items(user_id, params.kind).await?;
  Ok(Json(items))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /items`
pub async fn create<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(_): Requester,
  Json(body): Json<NewItem>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  let item = tracker.add_item(body).await?;
  Ok((StatusCode::CREATED, Json(item)))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /items/{id}`
pub async fn delete_one<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(_): Requester,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  tracker.delete_item(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Toggle ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ToggleParams {
  pub kind: ItemKind,
}

/// `PATCH /items/{id}/toggle?kind=<kind>`
pub async fn toggle<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(user_id): Requester,
  Path(id): Path<Uuid>,
  Query(params): Query<ToggleParams>,
) -> Result<Json<ToggleResult>, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  let result = tracker.toggle_completion(params.kind, id, user_id).await?;
  Ok(Json(result))
}
