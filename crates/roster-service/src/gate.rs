//! Join-window policy.
//!
//! Whether a session is still accepting joins is owned by the scheduling
//! layer, not by this crate; the service only consults the verdict. The
//! status gate (cancelled/completed sessions) is separate and lives in the
//! store, inside the join transaction.

use chrono::{DateTime, Duration, Utc};
use roster_core::session::Session;

/// Decides whether a session may accept new joins at a given instant.
/// Leaves are never gated.
pub trait JoinGate: Send + Sync {
  fn allows_join(&self, session: &Session, now: DateTime<Utc>) -> bool;
}

/// Closes the join window a fixed grace period after the session starts.
///
/// A zero grace closes joins exactly at `starts_at`; a negative one closes
/// them early.
pub struct CutoffGate {
  grace: Duration,
}

impl CutoffGate {
  pub fn new(grace: Duration) -> Self {
    Self { grace }
  }
}

impl JoinGate for CutoffGate {
  fn allows_join(&self, session: &Session, now: DateTime<Utc>) -> bool {
    now < session.starts_at + self.grace
  }
}

/// Admits at any time — for tests and deployments without a cutoff.
pub struct OpenGate;

impl JoinGate for OpenGate {
  fn allows_join(&self, _session: &Session, _now: DateTime<Utc>) -> bool {
    true
  }
}
