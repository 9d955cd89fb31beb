//! Error taxonomy for `roster-core`.
//!
//! Callers are expected to branch on these variants: capacity refusals and
//! closed sessions are ordinary outcomes, contention is retryable, and only
//! `Storage` is a genuine fault.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::session::SessionStatus;

/// Why a session refuses new joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotJoinableReason {
  /// The session status no longer admits participation changes.
  Status(SessionStatus),
  /// The join window set by the scheduling layer has closed.
  Cutoff,
}

impl fmt::Display for NotJoinableReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Status(status) => write!(f, "status is {}", status.as_str()),
      Self::Cutoff => write!(f, "join window has closed"),
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  /// The session is full. Recoverable: a slot may free up when someone
  /// leaves, so callers can retry later.
  #[error("session {session_id} is full (capacity {capacity})")]
  CapacityExceeded { session_id: Uuid, capacity: i64 },

  #[error("session {session_id} is not joinable: {reason}")]
  SessionNotJoinable {
    session_id: Uuid,
    reason:     NotJoinableReason,
  },

  /// A capacity edit would strand participants who already hold slots.
  #[error("capacity {capacity} is below current usage {used}")]
  CapacityBelowUsage { capacity: i64, used: i64 },

  #[error("capacity must be at least 1, got {0}")]
  InvalidCapacity(i64),

  /// Two writers collided and this request lost. Nothing was written; an
  /// immediate retry is safe.
  #[error("write contention on the store: {0}")]
  Conflict(String),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
