//! Password hashing, session tokens and the session extractors.
//!
//! A session token is 32 random bytes, URL-safe base64 encoded. The client
//! holds the token (cookie or `Authorization: Bearer`); the store only ever
//! sees its SHA-256 digest.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::Utc;
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};
use yuletide_core::{account::Account, store::AccountStore};

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "yuletide_session";

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2id PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// `false` for a wrong password and for an unparseable stored hash alike.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

pub fn new_session_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  B64.encode(bytes)
}

/// Hex SHA-256 of a token; the form stored in the sessions table.
pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// The token the client presented, preferring a bearer header over the cookie.
pub fn presented_token(headers: &HeaderMap) -> Option<String> {
  let bearer = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty());
  if let Some(token) = bearer {
    return Some(token.to_owned());
  }

  CookieJar::from_headers(headers)
    .get(SESSION_COOKIE)
    .map(|c| c.value().to_owned())
    .filter(|t| !t.is_empty())
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
  Cookie::build((SESSION_COOKIE, token))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(secure)
    .build()
}

pub fn removal_cookie() -> Cookie<'static> { Cookie::build(SESSION_COOKIE).path("/").build() }

async fn resolve<S>(headers: &HeaderMap, state: &AppState<S>) -> Result<Option<Account>, ApiError>
where
  S: AccountStore,
{
  let Some(token) = presented_token(headers) else {
    return Ok(None);
  };
  state
    .store
    .account_for_session(&token_digest(&token), Utc::now())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// The logged-in caller; rejects with 401 when there is no live session.
pub struct CurrentAccount(pub Account);

/// The caller's account if logged in. Never rejects on missing credentials.
pub struct Viewer(pub Option<Account>);

impl<S> FromRequestParts<AppState<S>> for CurrentAccount
where
  S: AccountStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve(&parts.headers, state)
      .await?
      .map(CurrentAccount)
      .ok_or(ApiError::Unauthorized)
  }
}

impl<S> FromRequestParts<AppState<S>> for Viewer
where
  S: AccountStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(Viewer(resolve(&parts.headers, state).await?))
  }
}
