//! Store traits for accounts, the wall and the bell.
//!
//! Implemented by storage backends (e.g. `yuletide-store-sqlite`). The HTTP
//! layer depends on these abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`). Time is always
//! passed in by the caller so windowed queries are deterministic under test.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  account::{Account, AccountId, NewAccount, Session, SignupOutcome},
  bell::{ChatCursor, ChatMessage, StrikeOutcome, StrikeRecord},
  guard::Guard,
  wall::{NewSnowball, PostOutcome},
};

// ─── Accounts ────────────────────────────────────────────────────────────────

pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new account unless the username or email is taken.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<SignupOutcome, Self::Error>> + Send + '_;

  fn get_account_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve a session token digest to its account, ignoring sessions that
  /// expired before `now`.
  fn account_for_session<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Remove a session. Deleting an unknown session is not an error.
  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Wall ────────────────────────────────────────────────────────────────────

pub trait WallStore: AccountStore {
  /// Insert a snowball, checking the one-per-IP rule in the same write
  /// transaction unless `guard` is exempt.
  fn post_snowball(
    &self,
    input: NewSnowball,
    guard: Guard,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<PostOutcome, Self::Error>> + Send + '_;

  /// Contents of every snowball, in insertion order.
  fn list_snowballs(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  fn has_posted<'a>(
    &'a self,
    ip_address: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

// ─── Bell ────────────────────────────────────────────────────────────────────

pub trait BellStore: AccountStore {
  /// Record a strike at `pressed_at`, checking the one-per-account rule in the
  /// same write transaction unless `guard` is exempt.
  fn strike(
    &self,
    account_id: AccountId,
    pressed_at: DateTime<Utc>,
    guard: Guard,
  ) -> impl Future<Output = Result<StrikeOutcome, Self::Error>> + Send + '_;

  /// Up to `limit` strikes ordered by ascending distance from `target`, ties
  /// in insertion order.
  fn closest_strikes(
    &self,
    target: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<StrikeRecord>, Self::Error>> + Send + '_;

  fn post_chat(
    &self,
    account_id: AccountId,
    content: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<ChatMessage, Self::Error>> + Send + '_;

  /// Messages after `cursor`, ascending by id.
  fn chat_since(
    &self,
    cursor: ChatCursor,
  ) -> impl Future<Output = Result<Vec<ChatMessage>, Self::Error>> + Send + '_;

  /// The newest `limit` messages, newest first.
  fn recent_chat(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ChatMessage>, Self::Error>> + Send + '_;

  /// Upsert the account's presence record.
  fn touch_presence(
    &self,
    account_id: AccountId,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Number of accounts whose last-seen is at or after `since`.
  fn count_present(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
