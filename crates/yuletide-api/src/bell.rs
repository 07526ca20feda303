//! Handlers for the New Year bell.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/` | Home page with the server time |
//! | `GET`  | `/api/time/` | `{"server_time": <epoch ms>}` |
//! | `POST` | `/api/strike/` | Auth; once per account |
//! | `GET`  | `/api/ranking/` | 50 strikes closest to the target |
//! | `GET`  | `/api/messages/` | 20 newest, newest first; `?last_id=` switches to cursor mode |
//! | `POST` | `/api/messages/` | Auth; returns 201 + message |
//! | `POST` | `/api/messages/send/` | Auth; `{"status":"success","message":{…}}` |
//! | `GET`  | `/get_messages/` | Cursor mode, `?last_id=` defaults to 0 |
//! | `GET`  | `/api/heartbeat/` | `{"active_users": n}` |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::{Html, IntoResponse},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use yuletide_core::{
  bell::{CHAT_MAX_CHARS, CHAT_RECENT, ChatCursor, ChatMessage, StrikeOutcome, presence_threshold},
  content,
  guard::Guard,
  ranking::{self, RANKING_LIMIT, RankedStrike, Target},
  store::BellStore,
};

use crate::{
  AppState,
  auth::{CurrentAccount, Viewer},
  error::ApiError,
  form::Submission,
  pages,
};

// ─── Pages and time ───────────────────────────────────────────────────────────

/// `GET /`
pub async fn index<S>(State(_state): State<AppState<S>>, Viewer(viewer): Viewer) -> Html<String>
where
  S: BellStore + 'static,
{
  pages::bell_home(Utc::now(), viewer.as_ref())
}

#[derive(Debug, Serialize)]
pub struct ServerTime {
  /// Milliseconds since the Unix epoch, with sub-millisecond fraction.
  pub server_time: f64,
}

/// `GET /api/time/`
pub async fn server_time() -> Json<ServerTime> {
  let server_time = Utc::now().timestamp_micros() as f64 / 1_000.0;
  Json(ServerTime { server_time })
}

// ─── Strike ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StrikeResponse {
  pub username:   String,
  pub press_time: DateTime<Utc>,
}

/// `POST /api/strike/`: early and late strikes are both accepted; only the
/// count per account is limited.
pub async fn strike<S>(
  State(state): State<AppState<S>>,
  CurrentAccount(account): CurrentAccount,
) -> Result<impl IntoResponse, ApiError>
where
  S: BellStore + 'static,
{
  let guard = Guard::for_caller(Some(&account));
  let outcome = state
    .store
    .strike(account.account_id, Utc::now(), guard)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  match outcome {
    StrikeOutcome::Struck(record) => {
      info!(username = %record.username, pressed_at = %record.pressed_at, "bell struck");
      Ok((
        StatusCode::CREATED,
        Json(StrikeResponse { username: record.username, press_time: record.pressed_at }),
      ))
    }
    StrikeOutcome::AlreadyStruck => {
      debug!(username = %account.username, "repeat strike rejected");
      Err(ApiError::BadRequest("you have already struck the bell".into()))
    }
  }
}

// ─── Ranking ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RankingResponse {
  pub records: Vec<RankedStrike>,
}

/// `GET /api/ranking/`
pub async fn ranking<S>(State(state): State<AppState<S>>) -> Result<Json<RankingResponse>, ApiError>
where
  S: BellStore,
{
  let target: &Target = &state.config.target;
  let records = state
    .store
    .closest_strikes(target.instant(), RANKING_LIMIT)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(RankingResponse { records: ranking::leaderboard(&records, target) }))
}

// ─── Chat ─────────────────────────────────────────────────────────────────────

/// A chat message as the client sees it; `created_at` is wall-clock time in
/// the target's offset.
#[derive(Debug, Serialize)]
pub struct ChatView {
  pub id:         i64,
  pub username:   String,
  pub content:    String,
  pub created_at: String,
}

impl ChatView {
  fn new(message: ChatMessage, target: &Target) -> Self {
    Self {
      id:         message.message_id,
      created_at: target.localize(message.created_at).format("%H:%M:%S").to_string(),
      username:   message.username,
      content:    message.content,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ChatPage {
  pub messages: Vec<ChatView>,
}

#[derive(Debug, Deserialize)]
pub struct ChatParams {
  /// Kept as text: anything that is not an integer means "first load".
  pub last_id: Option<String>,
}

fn parse_cursor(last_id: Option<&str>) -> ChatCursor {
  let id = last_id.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(0);
  ChatCursor::from_last_id(id)
}

fn to_page(messages: Vec<ChatMessage>, target: &Target) -> ChatPage {
  ChatPage { messages: messages.into_iter().map(|m| ChatView::new(m, target)).collect() }
}

/// `GET /api/messages/[?last_id=N]`
pub async fn list_messages<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ChatParams>,
) -> Result<Json<ChatPage>, ApiError>
where
  S: BellStore,
{
  let messages = match params.last_id.as_deref() {
    Some(last_id) => state.store.chat_since(parse_cursor(Some(last_id))).await,
    None => state.store.recent_chat(CHAT_RECENT).await,
  }
  .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(to_page(messages, &state.config.target)))
}

/// `GET /get_messages/[?last_id=N]`
pub async fn poll_messages<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ChatParams>,
) -> Result<Json<ChatPage>, ApiError>
where
  S: BellStore,
{
  let messages = state
    .store
    .chat_since(parse_cursor(params.last_id.as_deref()))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(to_page(messages, &state.config.target)))
}

#[derive(Debug, Deserialize)]
pub struct SendBody {
  #[serde(default)]
  pub content: String,
}

async fn post_chat<S>(
  state: &AppState<S>,
  account: &yuletide_core::account::Account,
  raw: &str,
) -> Result<ChatView, ApiError>
where
  S: BellStore,
{
  let content = content::clean(raw, CHAT_MAX_CHARS)?;
  let message = state
    .store
    .post_chat(account.account_id, content, Utc::now())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  debug!(message_id = message.message_id, username = %account.username, "chat message posted");
  Ok(ChatView::new(message, &state.config.target))
}

/// `POST /api/messages/`
pub async fn create_message<S>(
  State(state): State<AppState<S>>,
  CurrentAccount(account): CurrentAccount,
  Submission { body, .. }: Submission<SendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: BellStore + 'static,
{
  let view = post_chat(&state, &account, &body.content).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
  pub status:  &'static str,
  pub message: ChatView,
}

/// `POST /api/messages/send/`: the envelope the polling client expects.
pub async fn send_message<S>(
  State(state): State<AppState<S>>,
  CurrentAccount(account): CurrentAccount,
  Submission { body, .. }: Submission<SendBody>,
) -> Result<Json<SendResponse>, ApiError>
where
  S: BellStore + 'static,
{
  let message = post_chat(&state, &account, &body.content).await?;
  Ok(Json(SendResponse { status: "success", message }))
}

// ─── Presence ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
  pub active_users: u64,
}

/// `GET /api/heartbeat/`: refreshes the caller's presence when logged in,
/// then counts everyone seen in the last ten seconds.
pub async fn heartbeat<S>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<HeartbeatResponse>, ApiError>
where
  S: BellStore + 'static,
{
  let now = Utc::now();
  if let Some(account) = &viewer {
    state
      .store
      .touch_presence(account.account_id, now)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
  }

  let active_users = state
    .store
    .count_present(presence_threshold(now))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(HeartbeatResponse { active_users }))
}
