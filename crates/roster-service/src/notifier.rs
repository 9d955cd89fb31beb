//! Best-effort change notification.
//!
//! One broadcast channel per session, created lazily on first subscribe.
//! Delivery is fire-and-forget: a slow subscriber that overruns the channel
//! drops the oldest snapshots and can resynchronise with a fresh read, which
//! is exactly the contract a live availability display needs. Correctness
//! never depends on anything published here.

use std::{collections::HashMap, sync::Mutex};

use roster_core::snapshot::CapacitySnapshot;
use tokio::sync::broadcast;
use uuid::Uuid;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Per-session broadcast hub for capacity snapshots.
pub struct ChangeNotifier {
  channels: Mutex<HashMap<Uuid, broadcast::Sender<CapacitySnapshot>>>,
  capacity: usize,
}

impl ChangeNotifier {
  /// `capacity` is the per-session buffer of undelivered snapshots; beyond
  /// it, the slowest subscriber starts losing the oldest entries.
  pub fn new(capacity: usize) -> Self {
    Self {
      channels: Mutex::new(HashMap::new()),
      capacity: capacity.max(1),
    }
  }

  /// Subscribe to snapshot updates for one session.
  pub fn subscribe(&self, session_id: Uuid) -> broadcast::Receiver<CapacitySnapshot> {
    let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
    channels
      .entry(session_id)
      .or_insert_with(|| broadcast::channel(self.capacity).0)
      .subscribe()
  }

  /// Publish a snapshot to whoever is listening. A session nobody watches
  /// costs nothing; its channel is dropped on the next publish.
  pub fn publish(&self, session_id: Uuid, snapshot: CapacitySnapshot) {
    let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(tx) = channels.get(&session_id) {
      if tx.send(snapshot).is_err() {
        channels.remove(&session_id);
      }
    }
  }
}

impl Default for ChangeNotifier {
  fn default() -> Self {
    Self::new(DEFAULT_CHANNEL_CAPACITY)
  }
}
