//! Error types for `yuletide-core`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("content is empty")]
  EmptyContent,

  #[error("content is {len} characters; at most {max} are allowed")]
  ContentTooLong { len: usize, max: usize },

  #[error("username must be between 1 and {max} characters")]
  InvalidUsername { max: usize },

  #[error("invalid email address: {0:?}")]
  InvalidEmail(String),

  #[error("password must be at least {min} characters")]
  PasswordTooShort { min: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
