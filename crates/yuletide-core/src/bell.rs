//! New Year bell records: strikes, chat messages and presence.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::account::AccountId;

pub const CHAT_MAX_CHARS: usize = 30;
/// Messages returned on a client's first chat poll.
pub const CHAT_BACKLOG: usize = 100;
/// Messages returned by the plain chat listing.
pub const CHAT_RECENT: usize = 20;
/// Accounts seen within this window count as active.
pub const PRESENCE_WINDOW: Duration = Duration::from_secs(10);

/// A single bell strike, joined with the striker's username.
#[derive(Debug, Clone, Serialize)]
pub struct StrikeRecord {
  pub strike_id:  i64,
  pub account_id: AccountId,
  pub username:   String,
  pub pressed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum StrikeOutcome {
  Struck(StrikeRecord),
  /// The account already struck and is not exempt.
  AlreadyStruck,
}

/// A chat message, joined with the author's username.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
  pub message_id: i64,
  pub account_id: AccountId,
  pub username:   String,
  pub content:    String,
  pub created_at: DateTime<Utc>,
}

/// Where a chat poll resumes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCursor {
  /// First load: the newest [`CHAT_BACKLOG`] messages.
  Initial,
  /// Every message with an id strictly greater than this one.
  After(i64),
}

impl ChatCursor {
  /// Interpret a client-supplied `last_id`. Zero and negative ids mean a
  /// first load.
  pub fn from_last_id(last_id: i64) -> Self {
    if last_id > 0 { ChatCursor::After(last_id) } else { ChatCursor::Initial }
  }
}

/// Lower bound on `last_seen` for an account to count as active at `now`.
pub fn presence_threshold(now: DateTime<Utc>) -> DateTime<Utc> {
  now - chrono::Duration::from_std(PRESENCE_WINDOW).unwrap_or_default()
}
