//! Validation for short user-submitted text.

use crate::{Error, Result};

/// Trim `raw` and check it is non-empty and at most `max` characters.
///
/// Length is counted in Unicode scalar values, so a 15-character Korean
/// greeting is accepted where its UTF-8 byte length would not be.
pub fn clean(raw: &str, max: usize) -> Result<String> {
  let content = raw.trim();
  if content.is_empty() {
    return Err(Error::EmptyContent);
  }
  let len = content.chars().count();
  if len > max {
    return Err(Error::ContentTooLong { len, max });
  }
  Ok(content.to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trims_surrounding_whitespace() {
    assert_eq!(clean("  let it snow \n", 15).unwrap(), "let it snow");
  }

  #[test]
  fn whitespace_only_is_empty() {
    assert_eq!(clean(" \t ", 15), Err(Error::EmptyContent));
  }

  #[test]
  fn exactly_max_is_accepted() {
    assert!(clean("abcdefghijklmno", 15).is_ok());
  }

  #[test]
  fn over_max_is_rejected() {
    assert_eq!(
      clean("abcdefghijklmnop", 15),
      Err(Error::ContentTooLong { len: 16, max: 15 })
    );
  }

  #[test]
  fn counts_characters_not_bytes() {
    // 15 Hangul syllables, 45 bytes.
    assert!(clean("메리크리스마스메리크리스마스메", 15).is_ok());
  }
}
