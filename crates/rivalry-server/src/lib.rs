//! HTTP server for the rivalry tracker.
//!
//! Wires signup and Basic authentication in front of the
//! [`rivalry_api`] router, backed by any [`RivalStore`].

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  extract::State,
  http::StatusCode,
  middleware,
  response::IntoResponse,
  routing::post,
};
use chrono::{FixedOffset, NaiveDate};
use rivalry_core::{
  achievement::{Achievement, Catalog},
  clock::{Clock, SystemClock},
  store::RivalStore,
  tracker::{Tracker, TrackerConfig},
  user::NewUser,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `RIVALRY_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Offset of the reference timezone, in minutes east of UTC.
  #[serde(default)]
  pub utc_offset_minutes: i32,
  #[serde(default)]
  pub battle_end:         Option<NaiveDate>,
  #[serde(default = "default_chat_history_limit")]
  pub chat_history_limit: usize,
  /// Replaces the built-in achievement catalog when present.
  #[serde(default)]
  pub achievements:       Option<Vec<Achievement>>,
}

fn default_chat_history_limit() -> usize { 200 }

impl ServerConfig {
  pub fn tracker_config(&self) -> Result<TrackerConfig, Error> {
    let utc_offset = self
      .utc_offset_minutes
      .checked_mul(60)
      .and_then(FixedOffset::east_opt)
      .ok_or_else(|| {
        Error::Config(format!(
          "utc_offset_minutes out of range: {}",
          self.utc_offset_minutes
        ))
      })?;
    Ok(TrackerConfig {
      utc_offset,
      battle_end: self.battle_end,
      chat_history_limit: self.chat_history_limit,
    })
  }

  pub fn catalog(&self) -> Result<Catalog, Error> {
    match &self.achievements {
      Some(entries) => Ok(Catalog::new(entries.clone())?),
      None => Ok(Catalog::default()),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the server's own handlers.
pub struct AppState<S, C = SystemClock> {
  pub tracker: Arc<Tracker<S, C>>,
}

impl<S, C> Clone for AppState<S, C> {
  fn clone(&self) -> Self { Self { tracker: self.tracker.clone() } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: `POST /signup` is open, everything
/// else goes through [`auth::require_auth`].
pub fn router<S, C>(state: AppState<S, C>) -> Router
where
  S: RivalStore + 'static,
  C: Clock + 'static,
{
  let api = rivalry_api::api_router(state.tracker.clone()).layer(
    middleware::from_fn_with_state(state.clone(), auth::require_auth::<S, C>),
  );

  Router::new()
    .route("/signup", post(signup::<S, C>))
    .with_state(state)
    .merge(api)
    .layer(TraceLayer::new_for_http())
}

// ─── Signup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignupBody {
  pub name:       String,
  pub email:      String,
  pub password:   String,
  pub rival_code: String,
}

/// `POST /signup`: 201 with the new user, 409 if the code is full or the
/// email is registered.
async fn signup<S, C>(
  State(state): State<AppState<S, C>>,
  Json(body): Json<SignupBody>,
) -> Result<impl IntoResponse, Error>
where
  S: RivalStore + 'static,
  C: Clock + 'static,
{
  if body.password.is_empty() {
    return Err(Error::BadRequest("password is required".into()));
  }
  let rival_code = body.rival_code.trim().to_owned();
  // Skip the argon2 work for a code that is visibly full.
  state.tracker.assert_can_join(&rival_code).await?;

  let user = state
    .tracker
    .join_rival_code(NewUser {
      name: body.name.trim().to_owned(),
      email: auth::normalize_email(&body.email),
      rival_code,
      password_hash: auth::hash_password(&body.password)?,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(user)))
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use rivalry_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState {
      tracker: Arc::new(Tracker::new(
        Arc::new(store),
        SystemClock,
        Catalog::default(),
        TrackerConfig::default(),
      )),
    }
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn oneshot_raw(
    state:   AppState<SqliteStore>,
    method:  &str,
    uri:     &str,
    headers: Vec<(header::HeaderName, &str)>,
    body:    &str,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn signup_as(
    state: AppState<SqliteStore>,
    name:  &str,
    code:  &str,
  ) -> axum::response::Response {
    let body = json!({
      "name": name,
      "email": format!("{name}@example.com"),
      "password": "secret",
      "rival_code": code,
    });
    oneshot_raw(
      state,
      "POST",
      "/signup",
      vec![(header::CONTENT_TYPE, "application/json")],
      &body.to_string(),
    )
    .await
  }

  async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  // ── Signup ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn signup_assigns_icons_and_caps_pairing() {
    let state = make_state().await;

    let first = signup_as(state.clone(), "ada", "duel").await;
    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(json_body(first).await["icon"], "🦊");

    let second = signup_as(state.clone(), "bob", "duel").await;
    assert_eq!(second.status(), StatusCode::CREATED);
    let second = json_body(second).await;
    assert_eq!(second["icon"], "⚡");
    assert!(second.get("password_hash").is_none());

    let third = signup_as(state, "cy", "duel").await;
    assert_eq!(third.status(), StatusCode::CONFLICT);
    assert!(json_body(third).await["error"].is_string());
  }

  #[tokio::test]
  async fn duplicate_email_conflicts() {
    let state = make_state().await;
    signup_as(state.clone(), "ada", "duel").await;
    let again = signup_as(state, "ada", "elsewhere").await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn empty_password_is_rejected() {
    let state = make_state().await;
    let body = json!({
      "name": "ada",
      "email": "ada@example.com",
      "password": "",
      "rival_code": "duel",
    });
    let resp = oneshot_raw(
      state,
      "POST",
      "/signup",
      vec![(header::CONTENT_TYPE, "application/json")],
      &body.to_string(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Authentication ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn api_requires_credentials() {
    let state = make_state().await;
    let resp = oneshot_raw(state, "GET", "/me", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn wrong_password_is_401() {
    let state = make_state().await;
    signup_as(state.clone(), "ada", "duel").await;
    let auth = auth_header("ada@example.com", "wrong");
    let resp = oneshot_raw(
      state,
      "GET",
      "/me",
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn unknown_account_is_401() {
    let state = make_state().await;
    let auth = auth_header("nobody@example.com", "secret");
    let resp = oneshot_raw(
      state,
      "GET",
      "/me",
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn authenticated_requests_reach_api() {
    let state = make_state().await;
    signup_as(state.clone(), "ada", "duel").await;
    let auth = auth_header("Ada@Example.com", "secret");

    let resp = oneshot_raw(
      state.clone(),
      "GET",
      "/me",
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["name"], "ada");

    let resp = oneshot_raw(
      state,
      "GET",
      "/dashboard",
      vec![(header::AUTHORIZATION, auth.as_str())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json_body(resp).await["rival"].is_null());
  }

  // ── Configuration ───────────────────────────────────────────────────────────

  fn config(offset: i32) -> ServerConfig {
    ServerConfig {
      host:               "127.0.0.1".to_string(),
      port:               3000,
      store_path:         PathBuf::from(":memory:"),
      utc_offset_minutes: offset,
      battle_end:         None,
      chat_history_limit: 200,
      achievements:       None,
    }
  }

  #[test]
  fn offset_is_converted_to_seconds() {
    let tc = config(330).tracker_config().unwrap();
    assert_eq!(tc.utc_offset.local_minus_utc(), 330 * 60);
  }

  #[test]
  fn out_of_range_offset_is_rejected() {
    assert!(matches!(config(24 * 60).tracker_config(), Err(Error::Config(_))));
  }

  #[test]
  fn configured_catalog_replaces_builtin() {
    let mut cfg = config(0);
    cfg.achievements = Some(vec![Achievement {
      name:        "Warm Up".into(),
      description: "Complete one task".into(),
      icon:        "🏁".into(),
      category:    None,
      rule:        rivalry_core::achievement::Rule::Count { threshold: 1 },
    }]);
    assert_eq!(cfg.catalog().unwrap().len(), 1);

    let mut dup = cfg.clone();
    if let Some(list) = dup.achievements.as_mut() {
      list.push(list[0].clone());
    }
    assert!(matches!(dup.catalog(), Err(Error::Config(_))));
  }
}
