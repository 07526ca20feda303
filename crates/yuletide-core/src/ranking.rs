//! Closest-to-target ranking for bell strikes.
//!
//! The store orders strikes by `|pressed_at - target|`; this module turns the
//! ordered records into leaderboard rows shown in the target's own offset.

use chrono::{DateTime, FixedOffset, TimeZone as _, Utc};
use serde::{Deserialize, Serialize};

use crate::bell::StrikeRecord;

/// Leaderboard length.
pub const RANKING_LIMIT: usize = 50;

/// Asia/Seoul has no daylight saving, so a fixed +09:00 offset is exact.
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// The instant strikes are ranked against, carrying the offset used for
/// display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(DateTime<FixedOffset>);

impl Target {
  pub fn new(at: DateTime<FixedOffset>) -> Self { Self(at) }

  /// 2026-01-01 00:00:00 in Seoul.
  pub fn new_year_2026() -> Self {
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS).expect("+09:00 is a valid offset");
    let at = kst
      .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
      .single()
      .expect("midnight exists in a fixed offset");
    Self(at)
  }

  pub fn instant(&self) -> DateTime<Utc> { self.0.with_timezone(&Utc) }

  pub fn offset(&self) -> FixedOffset { *self.0.offset() }

  /// Convert `at` into the target's offset.
  pub fn localize(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.with_timezone(&self.offset())
  }

  /// Signed seconds from the target to `at`; positive means after.
  pub fn diff_seconds(&self, at: DateTime<Utc>) -> f64 {
    let delta = at - self.instant();
    match delta.num_microseconds() {
      Some(us) => us as f64 / 1_000_000.0,
      None => delta.num_milliseconds() as f64 / 1_000.0,
    }
  }
}

impl Default for Target {
  fn default() -> Self { Self::new_year_2026() }
}

/// One leaderboard row.
#[derive(Debug, Clone, Serialize)]
pub struct RankedStrike {
  pub username:       String,
  pub press_time_kst: DateTime<FixedOffset>,
  pub diff_seconds:   f64,
  pub diff_display:   String,
}

impl RankedStrike {
  pub fn new(record: &StrikeRecord, target: &Target) -> Self {
    let diff_seconds = target.diff_seconds(record.pressed_at);
    Self {
      username: record.username.clone(),
      press_time_kst: target.localize(record.pressed_at),
      diff_seconds,
      diff_display: format_diff(diff_seconds),
    }
  }
}

/// `+0.1234s` after the target, `-0.1234s` before, `0.0000s` on the dot.
pub fn format_diff(seconds: f64) -> String {
  let sign = if seconds > 0.0 { "+" } else { "" };
  format!("{sign}{seconds:.4}s")
}

/// Build leaderboard rows from records already ordered by the store.
pub fn leaderboard(records: &[StrikeRecord], target: &Target) -> Vec<RankedStrike> {
  records
    .iter()
    .take(RANKING_LIMIT)
    .map(|r| RankedStrike::new(r, target))
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn strike(username: &str, pressed_at: DateTime<Utc>) -> StrikeRecord {
    StrikeRecord { strike_id: 1, account_id: 1, username: username.into(), pressed_at }
  }

  #[test]
  fn default_target_is_new_year_in_seoul() {
    let target = Target::default();
    assert_eq!(target.instant().to_rfc3339(), "2025-12-31T15:00:00+00:00");
    assert_eq!(target.offset().local_minus_utc(), KST_OFFSET_SECS);
  }

  #[test]
  fn diff_display_has_explicit_sign() {
    assert_eq!(format_diff(0.5), "+0.5000s");
    assert_eq!(format_diff(-0.5), "-0.5000s");
    assert_eq!(format_diff(0.0), "0.0000s");
    assert_eq!(format_diff(12.34567), "+12.3457s");
  }

  #[test]
  fn ranked_row_is_shown_in_target_offset() {
    let target = Target::default();
    let pressed = target.instant() + Duration::milliseconds(500);
    let row = RankedStrike::new(&strike("dasher", pressed), &target);

    assert_eq!(row.username, "dasher");
    assert_eq!(row.press_time_kst.to_rfc3339(), "2026-01-01T00:00:00.500+09:00");
    assert!((row.diff_seconds - 0.5).abs() < 1e-9);
    assert_eq!(row.diff_display, "+0.5000s");
  }

  #[test]
  fn early_strikes_have_negative_diff() {
    let target = Target::default();
    let row = RankedStrike::new(&strike("prancer", target.instant() - Duration::seconds(2)), &target);
    assert_eq!(row.diff_display, "-2.0000s");
  }

  #[test]
  fn leaderboard_caps_at_limit() {
    let target = Target::default();
    let records: Vec<_> = (0..60)
      .map(|i| strike("cupid", target.instant() + Duration::seconds(i)))
      .collect();
    assert_eq!(leaderboard(&records, &target).len(), RANKING_LIMIT);
  }

  #[test]
  fn target_deserialises_from_rfc3339() {
    let target: Target = serde_json::from_str("\"2026-01-01T00:00:00+09:00\"").unwrap();
    assert_eq!(target, Target::default());
  }
}
