//! JSON REST API for the rivalry tracker.
//!
//! Exposes an axum [`Router`] backed by a [`Tracker`] over any
//! [`rivalry_core::store::RivalStore`]. Authentication is the caller's
//! responsibility: every route expects a [`Requester`] in the request
//! extensions.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new()
//!   .route("/signup", post(signup))
//!   .merge(rivalry_api::api_router(tracker.clone()).layer(auth))
//! ```

pub mod achievements;
pub mod chat;
pub mod error;
pub mod items;
pub mod progress;
pub mod requester;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, patch},
};
use rivalry_core::{clock::Clock, store::RivalStore, tracker::Tracker};

pub use error::ApiError;
pub use requester::Requester;

/// Build a fully-materialised API router for `tracker`.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(tracker: Arc<Tracker<S, C>>) -> Router<()>
where
  S: RivalStore + 'static,
  C: Clock + 'static,
{
  Router::new()
    .route("/me", get(progress::me::<S, C>))
    // Curriculum
    .route("/items", get(items::list::<S, C>).post(items::create::<S, C>))
    .route("/items/{id}", delete(items::delete_one::<S, C>))
    .route("/items/{id}/toggle", patch(items::toggle::<S, C>))
    // Read side
    .route("/dashboard", get(progress::dashboard::<S, C>))
    .route("/battle", get(progress::battle::<S, C>))
    .route("/achievements", get(achievements::list::<S, C>))
    .route("/achievements/compare", get(achievements::compare::<S, C>))
    // Chat
    .route("/chat", get(chat::history::<S, C>).post(chat::send::<S, C>))
    .with_state(tracker)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{DateTime, Utc};
  use rivalry_core::{
    achievement::Catalog,
    clock::FixedClock,
    tracker::TrackerConfig,
    user::NewUser,
  };
  use rivalry_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  type TestTracker = Tracker<SqliteStore, FixedClock>;

  async fn make_tracker() -> Arc<TestTracker> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let now = DateTime::parse_from_rfc3339("2026-03-04T09:00:00Z")
      .unwrap()
      .with_timezone(&Utc);
    Arc::new(Tracker::new(
      Arc::new(store),
      FixedClock::new(now),
      Catalog::default(),
      TrackerConfig::default(),
    ))
  }

  async fn signup(tracker: &TestTracker, name: &str) -> Uuid {
    tracker
      .join_rival_code(NewUser {
        name:          name.into(),
        email:         format!("{name}@example.com"),
        rival_code:    "duel".into(),
        password_hash: "hash".into(),
      })
      .await
      .unwrap()
      .user_id
  }

  async fn call(
    tracker: &Arc<TestTracker>,
    method:  &str,
    uri:     &str,
    as_user: Option<Uuid>,
    body:    Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let body = body.map_or_else(Body::empty, |v| Body::from(v.to_string()));
    let mut req = builder.body(body).unwrap();
    if let Some(id) = as_user {
      req.extensions_mut().insert(Requester(id));
    }

    let resp = api_router(tracker.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn physics_lecture(number: &str) -> Value {
    json!({
      "kind": "lecture",
      "subject": "Physics",
      "grouping": "Kinematics",
      "number": number,
      "name": format!("Lecture {number}"),
    })
  }

  // ── Auth ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_requester_is_401() {
    let tracker = make_tracker().await;
    let (status, body) = call(&tracker, "GET", "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn me_hides_password_hash() {
    let tracker = make_tracker().await;
    let ada = signup(&tracker, "ada").await;
    let (status, body) = call(&tracker, "GET", "/me", Some(ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "ada");
    assert_eq!(body["icon"], "🦊");
    assert!(body.get("password_hash").is_none());
  }

  // ── Items ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_list_toggle_delete() {
    let tracker = make_tracker().await;
    let ada = signup(&tracker, "ada").await;

    let (status, item) =
      call(&tracker, "POST", "/items", Some(ada), Some(physics_lecture("1"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = item["item_id"].as_str().unwrap().to_owned();

    let (status, toggled) = call(
      &tracker,
      "PATCH",
      &format!("/items/{id}/toggle?kind=lecture"),
      Some(ada),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["completed"], true);
    assert_eq!(toggled["unlocked"], json!(["First Step"]));

    let (status, list) =
      call(&tracker, "GET", "/items?kind=lecture", Some(ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["item_id"], id.as_str());
    assert_eq!(list[0]["user_completed"], true);
    assert_eq!(list[0]["rival_completed"], false);

    let (status, _) =
      call(&tracker, "DELETE", &format!("/items/{id}"), Some(ada), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) =
      call(&tracker, "DELETE", &format!("/items/{id}"), Some(ada), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn blank_item_field_is_400() {
    let tracker = make_tracker().await;
    let ada = signup(&tracker, "ada").await;
    let mut body = physics_lecture("1");
    body["name"] = json!("   ");
    let (status, body) = call(&tracker, "POST", "/items", Some(ada), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));
  }

  #[tokio::test]
  async fn toggle_with_mismatched_kind_is_404() {
    let tracker = make_tracker().await;
    let ada = signup(&tracker, "ada").await;
    let (_, item) =
      call(&tracker, "POST", "/items", Some(ada), Some(physics_lecture("1"))).await;
    let id = item["item_id"].as_str().unwrap();

    let (status, _) = call(
      &tracker,
      "PATCH",
      &format!("/items/{id}/toggle?kind=practice_set"),
      Some(ada),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Read side ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn dashboard_without_rival_is_partial() {
    let tracker = make_tracker().await;
    let ada = signup(&tracker, "ada").await;
    let (status, body) = call(&tracker, "GET", "/dashboard", Some(ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["user"]["name"], "ada");
    assert!(body["rival"].is_null());
    assert!(body["comparison"].is_null());
  }

  #[tokio::test]
  async fn battle_without_rival_is_404() {
    let tracker = make_tracker().await;
    let ada = signup(&tracker, "ada").await;
    let (status, _) = call(&tracker, "GET", "/battle", Some(ada), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn paired_battle_reports_tie() {
    let tracker = make_tracker().await;
    let ada = signup(&tracker, "ada").await;
    signup(&tracker, "bob").await;
    let (status, body) = call(&tracker, "GET", "/battle", Some(ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["winner"], "tie");
    assert_eq!(body["has_ended"], false);
  }

  #[tokio::test]
  async fn achievements_report_catalog_size() {
    let tracker = make_tracker().await;
    let ada = signup(&tracker, "ada").await;
    let (status, body) = call(&tracker, "GET", "/achievements", Some(ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unlocked"], json!([]));
    assert_eq!(body["total_catalog_size"], tracker.catalog().len());
  }

  // ── Chat ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn chat_round_trip() {
    let tracker = make_tracker().await;
    let ada = signup(&tracker, "ada").await;
    let bob = signup(&tracker, "bob").await;

    let (status, _) = call(
      &tracker,
      "POST",
      "/chat",
      Some(ada),
      Some(json!({ "body": "catch me if you can" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, history) = call(&tracker, "GET", "/chat", Some(bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["body"], "catch me if you can");
    assert_eq!(history[0]["sender_name"], "ada");
    assert_eq!(history[0]["is_current_user"], false);
  }

  #[tokio::test]
  async fn blank_chat_message_is_400() {
    let tracker = make_tracker().await;
    let ada = signup(&tracker, "ada").await;
    let (status, _) =
      call(&tracker, "POST", "/chat", Some(ada), Some(json!({ "body": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }
}
