//! The one-contribution-per-identity rule shared by the wall and the bell.

use crate::account::Account;

/// How a store should treat an existing contribution from the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
  /// Reject the write if the identity already contributed.
  OncePerIdentity,
  /// Always accept; superusers may contribute any number of times.
  Exempt,
}

impl Guard {
  /// Pick the guard for a caller, who may be anonymous.
  pub fn for_caller(account: Option<&Account>) -> Self {
    match account {
      Some(a) if a.is_superuser => Guard::Exempt,
      _ => Guard::OncePerIdentity,
    }
  }

  pub fn is_exempt(self) -> bool { matches!(self, Guard::Exempt) }
}
