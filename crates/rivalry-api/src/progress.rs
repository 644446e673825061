//! Read-side handlers: the caller, the dashboard and the battle.

use std::sync::Arc;

use axum::{Json, extract::State};
use rivalry_core::{
  clock::Clock,
  compare::Dashboard,
  store::RivalStore,
  tracker::{BattleStatus, Tracker},
  user::User,
};

use crate::{error::ApiError, requester::Requester};

/// `GET /me`
pub async fn me<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(user_id): Requester,
) -> Result<Json<User>, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  Ok(Json(tracker.require_user(user_id).await?))
}

/// `GET /dashboard`: the caller's aggregates, plus the rival's and the
/// comparison once paired.
pub async fn dashboard<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(user_id): Requester,
) -> Result<Json<Dashboard>, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  Ok(Json(tracker.dashboard(user_id).await?))
}

/// `GET /battle`. 404 while unpaired.
pub async fn battle<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(user_id): Requester,
) -> Result<Json<BattleStatus>, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  Ok(Json(tracker.battle_status(user_id).await?))
}
