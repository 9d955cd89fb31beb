//! The append-only participation transition log.
//!
//! Every effective join or leave, member or anonymous, lands here in the same
//! transaction that performed it. The log is the audit trail behind the
//! mutable records in [`crate::participant`]; it is only ever appended to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::participant::ParticipantKind;

/// What a transition did. Idempotent no-ops are not logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionAction {
  Join,
  Leave,
}

impl TransitionAction {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Join => "join",
      Self::Leave => "leave",
    }
  }

  pub fn parse_str(s: &str) -> Option<Self> {
    match s {
      "join" => Some(Self::Join),
      "leave" => Some(Self::Leave),
      _ => None,
    }
  }
}

/// One logged transition.
///
/// `version` is the session version after the transition committed, so
/// ordering the log by version reconstructs the exact write order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipationEvent {
  pub event_id:    Uuid,
  pub session_id:  Uuid,
  /// Member uuid or attendee token, depending on `kind`.
  pub actor:       String,
  pub kind:        ParticipantKind,
  pub action:      TransitionAction,
  pub recorded_at: DateTime<Utc>,
  pub version:     i64,
}
