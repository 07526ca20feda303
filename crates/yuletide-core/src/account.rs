//! Accounts, sessions and signup validation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Error, Result};

pub type AccountId = i64;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

/// A registered user. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
  pub account_id:    AccountId,
  pub username:      String,
  pub email:         String,
  #[serde(skip)]
  pub password_hash: String,
  pub is_superuser:  bool,
  pub joined_at:     DateTime<Utc>,
}

/// Input to [`AccountStore::create_account`](crate::store::AccountStore::create_account).
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub username:      String,
  pub email:         String,
  /// argon2 PHC string, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub is_superuser:  bool,
}

/// Result of an account insert; uniqueness conflicts are not errors.
#[derive(Debug, Clone)]
pub enum SignupOutcome {
  Created(Account),
  UsernameTaken,
  EmailTaken,
}

/// A login session. Only the SHA-256 digest of the bearer token is stored.
#[derive(Debug, Clone)]
pub struct Session {
  pub token_hash: String,
  pub account_id: AccountId,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_live(&self, now: DateTime<Utc>) -> bool { self.expires_at > now }
}

/// Validated signup form, before the password is hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signup {
  pub username: String,
  pub email:    String,
  pub password: String,
}

impl Signup {
  /// Trim the username and email and check all three fields.
  pub fn parse(username: &str, email: &str, password: &str) -> Result<Self> {
    let username = username.trim();
    let len = username.chars().count();
    if len == 0 || len > USERNAME_MAX_CHARS {
      return Err(Error::InvalidUsername { max: USERNAME_MAX_CHARS });
    }

    let email = email.trim();
    match email.split_once('@') {
      Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
      _ => return Err(Error::InvalidEmail(email.to_owned())),
    }

    if password.chars().count() < PASSWORD_MIN_CHARS {
      return Err(Error::PasswordTooShort { min: PASSWORD_MIN_CHARS });
    }

    Ok(Self {
      username: username.to_owned(),
      email:    email.to_owned(),
      password: password.to_owned(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signup_trims_username_and_email() {
    let s = Signup::parse("  comet ", " comet@north.pole ", "sleighbells").unwrap();
    assert_eq!(s.username, "comet");
    assert_eq!(s.email, "comet@north.pole");
  }

  #[test]
  fn signup_rejects_blank_username() {
    assert!(matches!(
      Signup::parse("   ", "a@b.c", "sleighbells"),
      Err(Error::InvalidUsername { .. })
    ));
  }

  #[test]
  fn signup_rejects_email_without_at() {
    assert!(matches!(
      Signup::parse("comet", "north.pole", "sleighbells"),
      Err(Error::InvalidEmail(_))
    ));
    assert!(matches!(
      Signup::parse("comet", "@north.pole", "sleighbells"),
      Err(Error::InvalidEmail(_))
    ));
  }

  #[test]
  fn signup_rejects_short_password() {
    assert_eq!(
      Signup::parse("comet", "a@b.c", "short"),
      Err(Error::PasswordTooShort { min: PASSWORD_MIN_CHARS })
    );
  }

  #[test]
  fn account_serialisation_omits_password_hash() {
    let account = Account {
      account_id:    7,
      username:      "vixen".into(),
      email:         "vixen@example.com".into(),
      password_hash: "$argon2id$secret".into(),
      is_superuser:  false,
      joined_at:     Utc::now(),
    };
    let json = serde_json::to_value(&account).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["username"], "vixen");
  }
}
