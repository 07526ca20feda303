//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as `INTEGER` microseconds since the Unix epoch.
//! Rows are first read into `Raw*` structs inside the connection closure and
//! converted to domain types afterwards, where decoding can fail with our own
//! error type.

use chrono::{DateTime, Utc};
use yuletide_core::{
  account::Account,
  bell::{ChatMessage, StrikeRecord},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> i64 { dt.timestamp_micros() }

pub fn decode_dt(us: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_micros(us).ok_or(Error::Timestamp(us))
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

pub const ACCOUNT_COLUMNS: &str =
  "account_id, username, email, password_hash, is_superuser, joined_at_us";

pub struct RawAccount {
  pub account_id:    i64,
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub is_superuser:  bool,
  pub joined_at_us:  i64,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:    row.get(0)?,
      username:      row.get(1)?,
      email:         row.get(2)?,
      password_hash: row.get(3)?,
      is_superuser:  row.get(4)?,
      joined_at_us:  row.get(5)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      account_id:    self.account_id,
      username:      self.username,
      email:         self.email,
      password_hash: self.password_hash,
      is_superuser:  self.is_superuser,
      joined_at:     decode_dt(self.joined_at_us)?,
    })
  }
}

/// `SELECT` list for strikes joined with their account; alias `s` / `a`.
pub const STRIKE_COLUMNS: &str = "s.strike_id, s.account_id, a.username, s.pressed_at_us";

pub struct RawStrike {
  pub strike_id:     i64,
  pub account_id:    i64,
  pub username:      String,
  pub pressed_at_us: i64,
}

impl RawStrike {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      strike_id:     row.get(0)?,
      account_id:    row.get(1)?,
      username:      row.get(2)?,
      pressed_at_us: row.get(3)?,
    })
  }

  pub fn into_strike(self) -> Result<StrikeRecord> {
    Ok(StrikeRecord {
      strike_id:  self.strike_id,
      account_id: self.account_id,
      username:   self.username,
      pressed_at: decode_dt(self.pressed_at_us)?,
    })
  }
}

/// `SELECT` list for chat messages joined with their author; alias `m` / `a`.
pub const CHAT_COLUMNS: &str = "m.message_id, m.account_id, a.username, m.content, m.created_at_us";

pub struct RawChat {
  pub message_id:    i64,
  pub account_id:    i64,
  pub username:      String,
  pub content:       String,
  pub created_at_us: i64,
}

impl RawChat {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:    row.get(0)?,
      account_id:    row.get(1)?,
      username:      row.get(2)?,
      content:       row.get(3)?,
      created_at_us: row.get(4)?,
    })
  }

  pub fn into_chat(self) -> Result<ChatMessage> {
    Ok(ChatMessage {
      message_id: self.message_id,
      account_id: self.account_id,
      username:   self.username,
      content:    self.content,
      created_at: decode_dt(self.created_at_us)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_keep_microsecond_precision() {
    let dt = DateTime::parse_from_rfc3339("2026-01-01T00:00:00.123456+09:00")
      .unwrap()
      .with_timezone(&Utc);
    assert_eq!(decode_dt(encode_dt(dt)).unwrap(), dt);
  }

  #[test]
  fn out_of_range_timestamp_is_an_error() {
    assert!(matches!(decode_dt(i64::MAX), Err(Error::Timestamp(_))));
  }
}
