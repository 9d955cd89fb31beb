//! The capacity snapshot — the computed, current-state read model.
//!
//! Counts are always derived from the participation records at read time;
//! nothing in the system stores a running total. [`CapacitySnapshot::derive`]
//! is the one place the arithmetic lives, so every backend and every caller
//! agrees on how the two participant classes combine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Used/available counts for one session at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
  pub session_id:    Uuid,
  pub capacity:      i64,
  /// Session version at the time of the read. Monotonic; newer snapshots
  /// never carry a smaller version.
  pub version:       i64,
  /// Active member participations.
  pub private_count: i64,
  /// Active anonymous RSVPs.
  pub public_count:  i64,
  /// `private_count + public_count`.
  pub used:          i64,
  /// `capacity - used`, clamped at zero.
  pub available:     i64,
}

impl CapacitySnapshot {
  /// Derive a snapshot from raw counts. All construction goes through here.
  pub fn derive(
    session_id: Uuid,
    capacity: i64,
    version: i64,
    private_count: i64,
    public_count: i64,
  ) -> Self {
    let used = private_count + public_count;
    let available = (capacity - used).max(0);
    CapacitySnapshot {
      session_id,
      capacity,
      version,
      private_count,
      public_count,
      used,
      available,
    }
  }

  pub fn is_full(&self) -> bool {
    self.available == 0
  }
}
