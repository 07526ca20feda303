//! Error type for `yuletide-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("stored timestamp out of range: {0}")]
  Timestamp(i64),

  #[error("row count does not fit: {0}")]
  Count(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
