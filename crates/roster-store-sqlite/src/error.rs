//! Error type for `roster-store-sqlite`.
//!
//! Domain refusals mirror `roster_core::Error` variant for variant so the
//! `From` impl below is a straight mapping; everything else is a backend
//! fault and lands in `Storage` on the way up.

use roster_core::NotJoinableReason;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("session {session_id} is full (capacity {capacity})")]
  CapacityExceeded { session_id: Uuid, capacity: i64 },

  #[error("session {session_id} is not joinable: {reason}")]
  SessionNotJoinable {
    session_id: Uuid,
    reason:     NotJoinableReason,
  },

  #[error("capacity {capacity} is below current usage {used}")]
  CapacityBelowUsage { capacity: i64, used: i64 },

  #[error("capacity must be at least 1, got {0}")]
  InvalidCapacity(i64),

  /// SQLITE_BUSY survived the busy timeout. The transaction was rolled
  /// back; nothing was written.
  #[error("database busy: {0}")]
  Busy(String),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored discriminant column held text no variant matches.
  #[error("unreadable column value: {0}")]
  Decode(String),
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(ffi, msg))
        if ffi.code == rusqlite::ErrorCode::DatabaseBusy =>
      {
        Error::Busy(msg.unwrap_or_else(|| "database is busy".to_owned()))
      }
      other => Error::Database(other),
    }
  }
}

impl From<Error> for roster_core::Error {
  fn from(e: Error) -> Self {
    use roster_core::Error as Core;

    match e {
      Error::SessionNotFound(id) => Core::SessionNotFound(id),
      Error::CapacityExceeded {
        session_id,
        capacity,
      } => Core::CapacityExceeded {
        session_id,
        capacity,
      },
      Error::SessionNotJoinable { session_id, reason } => {
        Core::SessionNotJoinable { session_id, reason }
      }
      Error::CapacityBelowUsage { capacity, used } => {
        Core::CapacityBelowUsage { capacity, used }
      }
      Error::InvalidCapacity(c) => Core::InvalidCapacity(c),
      Error::Busy(msg) => Core::Conflict(msg),
      other => Core::Storage(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
