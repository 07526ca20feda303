//! Signup, login and logout, shared by both sites.
//!
//! | Method | Path (wall / bell) | Notes |
//! |--------|--------------------|-------|
//! | `GET`  | `/accounts/signup/` / `/signup/` | HTML form |
//! | `POST` | `/accounts/signup/` / `/signup/` | form or JSON `{username,email,password}` |
//! | `GET`  | `/accounts/login/` / `/login/` | HTML form |
//! | `POST` | `/accounts/login/` / `/login/` | form or JSON `{username,password}`; sets the session cookie |
//! | `POST` | `/accounts/logout/` / `/logout/` | drops the session |
//!
//! Form posts are answered with redirects or a re-rendered page; JSON posts
//! with JSON.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use yuletide_core::{
  account::{NewAccount, Session, Signup, SignupOutcome},
  store::AccountStore,
};

use crate::{
  App, AppState,
  auth::{self, hash_password, new_session_token, token_digest, verify_password},
  error::ApiError,
  form::Submission,
  pages,
};

/// Answer a rejected submission in the format it arrived in.
fn rejection(
  wants_json: bool,
  message: String,
  page: fn(App, Option<&str>) -> Html<String>,
  app: App,
) -> Response {
  if wants_json {
    ApiError::BadRequest(message).into_response()
  } else {
    (StatusCode::BAD_REQUEST, page(app, Some(&message))).into_response()
  }
}

// ─── Signup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignupBody {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

/// `GET <signup>`
pub async fn signup_page<S>(State(state): State<AppState<S>>) -> Html<String>
where
  S: AccountStore,
{
  pages::signup_form(state.app, None)
}

/// `POST <signup>`
pub async fn signup<S>(
  State(state): State<AppState<S>>,
  submission: Submission<SignupBody>,
) -> Result<Response, ApiError>
where
  S: AccountStore,
{
  let Submission { body, wants_json } = submission;

  let signup = match Signup::parse(&body.username, &body.email, &body.password) {
    Ok(s) => s,
    Err(e) => return Ok(rejection(wants_json, e.to_string(), pages::signup_form, state.app)),
  };

  let outcome = state
    .store
    .create_account(NewAccount {
      username:      signup.username,
      email:         signup.email,
      password_hash: hash_password(&signup.password)?,
      is_superuser:  false,
    })
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let account = match outcome {
    SignupOutcome::Created(a) => a,
    SignupOutcome::UsernameTaken => {
      let msg = "a user with that username already exists".to_owned();
      return Ok(rejection(wants_json, msg, pages::signup_form, state.app));
    }
    SignupOutcome::EmailTaken => {
      let msg = "a user with that email already exists".to_owned();
      return Ok(rejection(wants_json, msg, pages::signup_form, state.app));
    }
  };

  info!(username = %account.username, "account created");

  if wants_json {
    Ok((StatusCode::CREATED, Json(account)).into_response())
  } else {
    Ok(Redirect::to(state.app.login_path()).into_response())
  }
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
}

/// `GET <login>`
pub async fn login_page<S>(State(state): State<AppState<S>>) -> Html<String>
where
  S: AccountStore,
{
  pages::login_form(state.app, None)
}

/// `POST <login>`: on success sets the session cookie and, for JSON callers,
/// also returns the bearer token.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
  submission: Submission<LoginBody>,
) -> Result<Response, ApiError>
where
  S: AccountStore,
{
  let Submission { body, wants_json } = submission;

  let account = state
    .store
    .get_account_by_username(body.username.trim())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .filter(|a| verify_password(&body.password, &a.password_hash));

  let Some(account) = account else {
    debug!(username = %body.username, "login rejected");
    let msg = "please enter a correct username and password".to_owned();
    return Ok(rejection(wants_json, msg, pages::login_form, state.app));
  };

  let token = new_session_token();
  let now = Utc::now();
  let expires_at = now
    .checked_add_signed(state.config.session_ttl)
    .ok_or_else(|| ApiError::Internal("session lifetime is out of range".into()))?;
  state
    .store
    .create_session(Session {
      token_hash: token_digest(&token),
      account_id: account.account_id,
      created_at: now,
      expires_at,
    })
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  info!(username = %account.username, "logged in");

  let jar = jar.add(auth::session_cookie(token.clone(), state.config.secure_cookies));
  if wants_json {
    Ok((jar, Json(json!({ "token": token, "account": account }))).into_response())
  } else {
    Ok((jar, Redirect::to("/")).into_response())
  }
}

// ─── Logout ───────────────────────────────────────────────────────────────────

/// `POST <logout>`: always succeeds, even without a session.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  jar: CookieJar,
) -> Result<impl IntoResponse, ApiError>
where
  S: AccountStore,
{
  if let Some(token) = auth::presented_token(&headers) {
    state
      .store
      .delete_session(&token_digest(&token))
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
  }
  Ok((jar.remove(auth::removal_cookie()), Redirect::to("/")))
}
