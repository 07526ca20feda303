//! Snowball wall records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::account::AccountId;

/// Maximum snowball length in characters.
pub const SNOWBALL_MAX_CHARS: usize = 15;

/// One message on the wall.
#[derive(Debug, Clone, Serialize)]
pub struct Snowball {
  pub snowball_id: i64,
  pub content:     String,
  pub ip_address:  String,
  pub created_at:  DateTime<Utc>,
  /// Set when the poster was logged in.
  pub account_id:  Option<AccountId>,
}

/// Input to [`WallStore::post_snowball`](crate::store::WallStore::post_snowball).
#[derive(Debug, Clone)]
pub struct NewSnowball {
  /// Already validated with [`crate::content::clean`].
  pub content:    String,
  pub ip_address: String,
  pub account_id: Option<AccountId>,
}

#[derive(Debug, Clone)]
pub enum PostOutcome {
  Posted(Snowball),
  /// The IP already has a snowball and the caller is not exempt.
  AlreadyPosted,
}
