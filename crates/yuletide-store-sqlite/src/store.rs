//! [`SqliteStore`]: the SQLite implementation of the Yuletide store traits.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::info;

use yuletide_core::{
  account::{Account, AccountId, NewAccount, Session, SignupOutcome},
  bell::{CHAT_BACKLOG, ChatCursor, ChatMessage, StrikeOutcome, StrikeRecord},
  guard::Guard,
  store::{AccountStore, BellStore, WallStore},
  wall::{NewSnowball, PostOutcome, Snowball},
};

use crate::{
  Error, Result,
  encode::{ACCOUNT_COLUMNS, CHAT_COLUMNS, RawAccount, RawChat, RawStrike, STRIKE_COLUMNS, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Yuletide store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    info!("store opened at {}", path.display());
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a chat query whose `SELECT` list is [`CHAT_COLUMNS`].
  async fn query_chat(&self, sql: String, param: i64) -> Result<Vec<ChatMessage>> {
    let raws: Vec<RawChat> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![param], RawChat::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChat::into_chat).collect()
  }
}

fn chat_select(tail: &str) -> String {
  format!(
    "SELECT {CHAT_COLUMNS}
     FROM chat_messages m
     JOIN accounts a ON a.account_id = m.account_id
     {tail}"
  )
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  type Error = Error;

  async fn create_account(&self, input: NewAccount) -> Result<SignupOutcome> {
    let joined_at = Utc::now();
    let joined_at_us = encode_dt(joined_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let username_taken: bool = tx.query_row(
          "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ?1)",
          rusqlite::params![input.username],
          |r| r.get(0),
        )?;
        if username_taken {
          return Ok(SignupOutcome::UsernameTaken);
        }

        let email_taken: bool = tx.query_row(
          "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)",
          rusqlite::params![input.email],
          |r| r.get(0),
        )?;
        if email_taken {
          return Ok(SignupOutcome::EmailTaken);
        }

        tx.execute(
          "INSERT INTO accounts (username, email, password_hash, is_superuser, joined_at_us)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            input.username,
            input.email,
            input.password_hash,
            input.is_superuser,
            joined_at_us,
          ],
        )?;
        let account_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(SignupOutcome::Created(Account {
          account_id,
          username: input.username,
          email: input.email,
          password_hash: input.password_hash,
          is_superuser: input.is_superuser,
          joined_at,
        }))
      })
      .await?;

    Ok(outcome)
  }

  async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
    let username = username.to_owned();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
            rusqlite::params![username],
            RawAccount::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn create_session(&self, session: Session) -> Result<()> {
    let created_at_us = encode_dt(session.created_at);
    let expires_at_us = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, account_id, created_at_us, expires_at_us)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![session.token_hash, session.account_id, created_at_us, expires_at_us],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn account_for_session(
    &self,
    token_hash: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<Account>> {
    let token_hash = token_hash.to_owned();
    let now_us = encode_dt(now);

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT a.account_id, a.username, a.email, a.password_hash,
                    a.is_superuser, a.joined_at_us
             FROM sessions s
             JOIN accounts a ON a.account_id = s.account_id
             WHERE s.token_hash = ?1
               AND s.expires_at_us > ?2",
            rusqlite::params![token_hash, now_us],
            RawAccount::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn delete_session(&self, token_hash: &str) -> Result<()> {
    let token_hash = token_hash.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE token_hash = ?1", rusqlite::params![token_hash])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── WallStore impl ──────────────────────────────────────────────────────────

impl WallStore for SqliteStore {
  async fn post_snowball(
    &self,
    input: NewSnowball,
    guard: Guard,
    now: DateTime<Utc>,
  ) -> Result<PostOutcome> {
    let created_at_us = encode_dt(now);

    let outcome = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock before the existence check, so two
        // posts from one IP cannot both pass it.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !guard.is_exempt() {
          let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM snowballs WHERE ip_address = ?1)",
            rusqlite::params![input.ip_address],
            |r| r.get(0),
          )?;
          if exists {
            return Ok(PostOutcome::AlreadyPosted);
          }
        }

        tx.execute(
          "INSERT INTO snowballs (content, ip_address, created_at_us, account_id)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![input.content, input.ip_address, created_at_us, input.account_id],
        )?;
        let snowball_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(PostOutcome::Posted(Snowball {
          snowball_id,
          content: input.content,
          ip_address: input.ip_address,
          created_at: now,
          account_id: input.account_id,
        }))
      })
      .await?;

    Ok(outcome)
  }

  async fn list_snowballs(&self) -> Result<Vec<String>> {
    let contents = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT content FROM snowballs ORDER BY snowball_id")?;
        let rows = stmt
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(contents)
  }

  async fn has_posted(&self, ip_address: &str) -> Result<bool> {
    let ip_address = ip_address.to_owned();

    let exists = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS(SELECT 1 FROM snowballs WHERE ip_address = ?1)",
          rusqlite::params![ip_address],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(exists)
  }
}

// ─── BellStore impl ──────────────────────────────────────────────────────────

impl BellStore for SqliteStore {
  async fn strike(
    &self,
    account_id: AccountId,
    pressed_at: DateTime<Utc>,
    guard: Guard,
  ) -> Result<StrikeOutcome> {
    let pressed_at_us = encode_dt(pressed_at);

    let raw: Option<RawStrike> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !guard.is_exempt() {
          let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM strikes WHERE account_id = ?1)",
            rusqlite::params![account_id],
            |r| r.get(0),
          )?;
          if exists {
            return Ok(None);
          }
        }

        tx.execute(
          "INSERT INTO strikes (account_id, pressed_at_us) VALUES (?1, ?2)",
          rusqlite::params![account_id, pressed_at_us],
        )?;
        let strike_id = tx.last_insert_rowid();

        let raw = tx.query_row(
          &format!(
            "SELECT {STRIKE_COLUMNS}
             FROM strikes s
             JOIN accounts a ON a.account_id = s.account_id
             WHERE s.strike_id = ?1"
          ),
          rusqlite::params![strike_id],
          RawStrike::from_row,
        )?;
        tx.commit()?;

        Ok(Some(raw))
      })
      .await?;

    match raw {
      Some(raw) => Ok(StrikeOutcome::Struck(raw.into_strike()?)),
      None => Ok(StrikeOutcome::AlreadyStruck),
    }
  }

  async fn closest_strikes(&self, target: DateTime<Utc>, limit: usize) -> Result<Vec<StrikeRecord>> {
    let target_us = encode_dt(target);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawStrike> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {STRIKE_COLUMNS}
           FROM strikes s
           JOIN accounts a ON a.account_id = s.account_id
           ORDER BY ABS(s.pressed_at_us - ?1), s.strike_id
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![target_us, limit], RawStrike::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStrike::into_strike).collect()
  }

  async fn post_chat(
    &self,
    account_id: AccountId,
    content: String,
    now: DateTime<Utc>,
  ) -> Result<ChatMessage> {
    let created_at_us = encode_dt(now);

    let raw: RawChat = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO chat_messages (account_id, content, created_at_us) VALUES (?1, ?2, ?3)",
          rusqlite::params![account_id, content, created_at_us],
        )?;
        let message_id = tx.last_insert_rowid();
        let raw = tx.query_row(
          &chat_select("WHERE m.message_id = ?1"),
          rusqlite::params![message_id],
          RawChat::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_chat()
  }

  async fn chat_since(&self, cursor: ChatCursor) -> Result<Vec<ChatMessage>> {
    match cursor {
      ChatCursor::Initial => {
        let mut newest = self
          .query_chat(chat_select("ORDER BY m.message_id DESC LIMIT ?1"), CHAT_BACKLOG as i64)
          .await?;
        newest.reverse();
        Ok(newest)
      }
      ChatCursor::After(last_id) => {
        self
          .query_chat(chat_select("WHERE m.message_id > ?1 ORDER BY m.message_id"), last_id)
          .await
      }
    }
  }

  async fn recent_chat(&self, limit: usize) -> Result<Vec<ChatMessage>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    self
      .query_chat(chat_select("ORDER BY m.message_id DESC LIMIT ?1"), limit)
      .await
  }

  async fn touch_presence(&self, account_id: AccountId, now: DateTime<Utc>) -> Result<()> {
    let now_us = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO presence (account_id, last_seen_us) VALUES (?1, ?2)
           ON CONFLICT(account_id) DO UPDATE SET last_seen_us = excluded.last_seen_us",
          rusqlite::params![account_id, now_us],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_present(&self, since: DateTime<Utc>) -> Result<u64> {
    let since_us = encode_dt(since);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM presence WHERE last_seen_us >= ?1",
          rusqlite::params![since_us],
          |r| r.get(0),
        )?)
      })
      .await?;

    u64::try_from(count).map_err(|_| Error::Count(count))
  }
}
