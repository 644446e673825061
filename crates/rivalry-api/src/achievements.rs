//! Handlers for `/achievements` endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};
use rivalry_core::{
  clock::Clock,
  store::RivalStore,
  tracker::{AchievementComparison, AchievementsView, Tracker},
};

use crate::{error::ApiError, requester::Requester};

/// `GET /achievements`
pub async fn list<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(user_id): Requester,
) -> Result<Json<AchievementsView>, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  Ok(Json(tracker.achievements(user_id).await?))
}

/// `GET /achievements/compare`
pub async fn compare<S, C>(
  State(tracker): State<Arc<Tracker<S, C>>>,
  Requester(user_id): Requester,
) -> Result<Json<AchievementComparison>, ApiError>
where
  S: RivalStore,
  C: Clock,
{
  Ok(Json(tracker.compare_achievements(user_id).await?))
}
