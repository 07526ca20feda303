//! Handlers for the snowball wall.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/` | Home page with the caller's `has_posted` flag |
//! | `GET`  | `/get_messages/` | `{"messages": [string, ...]}` |
//! | `POST` | `/add_message/` | Body: `{"content": "..."}`; one per IP |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  response::Html,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use yuletide_core::{
  content,
  guard::Guard,
  store::WallStore,
  wall::{NewSnowball, PostOutcome, SNOWBALL_MAX_CHARS},
};

use crate::{
  AppState,
  auth::Viewer,
  client_ip::ClientIp,
  error::ApiError,
  pages,
};

/// `GET /`
pub async fn index<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  Viewer(viewer): Viewer,
) -> Result<Html<String>, ApiError>
where
  S: WallStore + 'static,
{
  let has_posted = state
    .store
    .has_posted(&ip)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(pages::wall_home(Utc::now(), has_posted, viewer.as_ref()))
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
  pub messages: Vec<String>,
}

/// `GET /get_messages/`
pub async fn get_messages<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<MessagesResponse>, ApiError>
where
  S: WallStore,
{
  let messages = state
    .store
    .list_snowballs()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(MessagesResponse { messages }))
}

#[derive(Debug, Deserialize)]
pub struct AddMessageBody {
  #[serde(default)]
  pub content: String,
}

#[derive(Debug, Serialize)]
pub struct AddMessageResponse {
  pub status:  &'static str,
  pub content: String,
}

/// `POST /add_message/`
///
/// Checks run in order: empty, too long, already posted from this IP. An
/// unreadable body is an unexpected fault and answers 500 with its text.
pub async fn add_message<S>(
  State(state): State<AppState<S>>,
  ClientIp(ip): ClientIp,
  Viewer(viewer): Viewer,
  body: Result<Json<AddMessageBody>, JsonRejection>,
) -> Result<Json<AddMessageResponse>, ApiError>
where
  S: WallStore + 'static,
{
  let Json(body) = body.map_err(|e| ApiError::Internal(e.body_text()))?;
  let content = content::clean(&body.content, SNOWBALL_MAX_CHARS)?;

  let guard = Guard::for_caller(viewer.as_ref());
  let input = NewSnowball {
    content,
    ip_address: ip.clone(),
    account_id: viewer.as_ref().map(|a| a.account_id),
  };

  let outcome = state
    .store
    .post_snowball(input, guard, Utc::now())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  match outcome {
    PostOutcome::Posted(snowball) => {
      info!(snowball_id = snowball.snowball_id, %ip, "snowball posted");
      Ok(Json(AddMessageResponse { status: "success", content: snowball.content }))
    }
    PostOutcome::AlreadyPosted => {
      debug!(%ip, "duplicate snowball rejected");
      Err(ApiError::Forbidden("this address has already posted a snowball".into()))
    }
  }
}
