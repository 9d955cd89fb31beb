//! Session — a scheduled activity whose participation is tracked.
//!
//! A session holds scheduling metadata and a fixed capacity. Who is actually
//! in the room is never stored on the session itself; it is derived on read
//! from the participation records (see [`crate::snapshot`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a session. Only `Scheduled` sessions accept joins;
/// leaves are honoured in every status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
  Scheduled,
  InProgress,
  Completed,
  Cancelled,
}

impl SessionStatus {
  /// Stable string form, shared by storage encoding and CLI parsing.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Scheduled => "scheduled",
      Self::InProgress => "in_progress",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    }
  }

  /// Inverse of [`as_str`](Self::as_str). Returns `None` for unknown input.
  pub fn parse_str(s: &str) -> Option<Self> {
    match s {
      "scheduled" => Some(Self::Scheduled),
      "in_progress" => Some(Self::InProgress),
      "completed" => Some(Self::Completed),
      "cancelled" => Some(Self::Cancelled),
      _ => None,
    }
  }

  /// Whether new joins are accepted in this status.
  pub fn is_joinable(self) -> bool {
    matches!(self, Self::Scheduled)
  }
}

/// A scheduled activity instance with a fixed capacity.
///
/// `version` only moves forward. It is bumped in the same transaction as any
/// write that changes the derived snapshot, so readers can order snapshots
/// without comparing counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub session_id: Uuid,
  pub owner_id:   Uuid,
  pub capacity:   i64,
  pub starts_at:  DateTime<Utc>,
  pub status:     SessionStatus,
  pub version:    i64,
  pub created_at: DateTime<Utc>,
}

/// Input to [`SessionStore::create_session`](crate::store::SessionStore::create_session).
/// The id, status, version and creation timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewSession {
  pub owner_id:  Uuid,
  pub capacity:  i64,
  pub starts_at: DateTime<Utc>,
}
