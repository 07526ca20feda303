//! HTTP layer for the Yuletide sites.
//!
//! Exposes one axum [`Router`] per application, each backed by any store that
//! implements the matching trait from [`yuletide_core::store`]. TLS and
//! transport concerns are the caller's responsibility; the server must be run
//! with `into_make_service_with_connect_info::<SocketAddr>()` so the wall can
//! fall back to the peer address when no `X-Forwarded-For` header is present.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = yuletide_api::bell_router(Arc::new(store), ApiConfig::default());
//! ```

pub mod accounts;
pub mod auth;
pub mod bell;
pub mod client_ip;
pub mod error;
pub mod form;
pub mod pages;
pub mod wall;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use yuletide_core::{
  ranking::Target,
  store::{BellStore, WallStore},
};

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime settings the handlers need.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub target:         Target,
  pub session_ttl:    chrono::Duration,
  /// Mark the session cookie `Secure`; enable behind HTTPS.
  pub secure_cookies: bool,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      target:         Target::default(),
      session_ttl:    chrono::Duration::days(14),
      secure_cookies: false,
    }
  }
}

/// Which site a router serves; decides where the account pages live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum App {
  Wall,
  Bell,
}

impl App {
  pub fn signup_path(self) -> &'static str {
    match self {
      App::Wall => "/accounts/signup/",
      App::Bell => "/signup/",
    }
  }

  pub fn login_path(self) -> &'static str {
    match self {
      App::Wall => "/accounts/login/",
      App::Bell => "/login/",
    }
  }

  pub fn logout_path(self) -> &'static str {
    match self {
      App::Wall => "/accounts/logout/",
      App::Bell => "/logout/",
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ApiConfig>,
  pub app:    App,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), config: self.config.clone(), app: self.app }
  }
}

// ─── Routers ──────────────────────────────────────────────────────────────────

/// Build the snowball wall router.
pub fn wall_router<S>(store: Arc<S>, config: ApiConfig) -> Router
where
  S: WallStore + 'static,
{
  let state = AppState { store, config: Arc::new(config), app: App::Wall };
  let app = state.app;

  Router::new()
    .route("/", get(wall::index::<S>).fallback(method_not_allowed))
    .route(
      "/get_messages/",
      get(wall::get_messages::<S>).fallback(method_not_allowed),
    )
    .route(
      "/add_message/",
      post(wall::add_message::<S>).fallback(method_not_allowed),
    )
    .route(
      app.signup_path(),
      get(accounts::signup_page::<S>)
        .post(accounts::signup::<S>)
        .fallback(method_not_allowed),
    )
    .route(
      app.login_path(),
      get(accounts::login_page::<S>)
        .post(accounts::login::<S>)
        .fallback(method_not_allowed),
    )
    .route(
      app.logout_path(),
      post(accounts::logout::<S>).fallback(method_not_allowed),
    )
    .fallback(not_found)
    .with_state(state)
}

/// Build the New Year bell router.
pub fn bell_router<S>(store: Arc<S>, config: ApiConfig) -> Router
where
  S: BellStore + 'static,
{
  let state = AppState { store, config: Arc::new(config), app: App::Bell };
  let app = state.app;

  Router::new()
    // Pages
    .route("/", get(bell::index::<S>).fallback(method_not_allowed))
    .route(
      app.signup_path(),
      get(accounts::signup_page::<S>)
        .post(accounts::signup::<S>)
        .fallback(method_not_allowed),
    )
    .route(
      app.login_path(),
      get(accounts::login_page::<S>)
        .post(accounts::login::<S>)
        .fallback(method_not_allowed),
    )
    .route(
      app.logout_path(),
      post(accounts::logout::<S>).fallback(method_not_allowed),
    )
    // API
    .route("/api/time/", get(bell::server_time).fallback(method_not_allowed))
    .route("/api/strike/", post(bell::strike::<S>).fallback(method_not_allowed))
    .route("/api/ranking/", get(bell::ranking::<S>).fallback(method_not_allowed))
    .route(
      "/api/messages/",
      get(bell::list_messages::<S>)
        .post(bell::create_message::<S>)
        .fallback(method_not_allowed),
    )
    .route(
      "/api/messages/send/",
      post(bell::send_message::<S>).fallback(method_not_allowed),
    )
    .route(
      "/api/heartbeat/",
      get(bell::heartbeat::<S>).fallback(method_not_allowed),
    )
    .route(
      "/get_messages/",
      get(bell::poll_messages::<S>).fallback(method_not_allowed),
    )
    .fallback(not_found)
    .with_state(state)
}

async fn not_found() -> ApiError { ApiError::NotFound }

/// Any method a route does not serve.
async fn method_not_allowed() -> ApiError { ApiError::MethodNotAllowed }

#[cfg(test)]
mod tests;
