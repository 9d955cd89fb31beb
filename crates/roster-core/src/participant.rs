//! Participant identities and their durable per-session records.
//!
//! Two classes of caller hold slots: authenticated members, known by a stable
//! opaque id minted by the identity provider, and anonymous attendees, known
//! only by an opaque token. Both are tracked separately but count against the
//! same capacity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Participant class. Members count as `Private`, anonymous attendees as
/// `Public`; the two never share a table but always share the capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
  Private,
  Public,
}

impl ParticipantKind {
  /// Stable string form, shared by storage encoding and log output.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Private => "private",
      Self::Public => "public",
    }
  }

  /// Inverse of [`as_str`](Self::as_str). Returns `None` for unknown input.
  pub fn parse_str(s: &str) -> Option<Self> {
    match s {
      "private" => Some(Self::Private),
      "public" => Some(Self::Public),
      _ => None,
    }
  }
}

/// A caller holding (or requesting) a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Participant {
  /// An authenticated member, identified by the id the identity provider
  /// attached to the request.
  Member(Uuid),
  /// An anonymous attendee, identified by an opaque token.
  Attendee(String),
}

impl Participant {
  pub fn kind(&self) -> ParticipantKind {
    match self {
      Self::Member(_) => ParticipantKind::Private,
      Self::Attendee(_) => ParticipantKind::Public,
    }
  }

  /// The identity as it appears in actor columns of the transition log.
  pub fn actor_id(&self) -> String {
    match self {
      Self::Member(id) => id.to_string(),
      Self::Attendee(token) => token.clone(),
    }
  }
}

/// Whether a member currently occupies a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationState {
  Joined,
  Left,
}

impl ParticipationState {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Joined => "joined",
      Self::Left => "left",
    }
  }

  pub fn parse_str(s: &str) -> Option<Self> {
    match s {
      "joined" => Some(Self::Joined),
      "left" => Some(Self::Left),
      _ => None,
    }
  }

  pub fn is_joined(self) -> bool {
    matches!(self, Self::Joined)
  }
}

/// Durable member participation record.
///
/// There is exactly one record per (session, member) pair for the session's
/// whole life. Leaving flips `state` to `Left` and stamps `left_at`; a later
/// rejoin flips it back, clears `left_at` and restamps `joined_at`. Records
/// are never deleted, so history survives any number of round trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipationRecord {
  pub session_id: Uuid,
  pub member_id:  Uuid,
  pub state:      ParticipationState,
  pub joined_at:  DateTime<Utc>,
  pub left_at:    Option<DateTime<Utc>>,
}

/// Durable anonymous RSVP record, one per (session, token) pair.
///
/// Cancelling flips `attending` to `false` in place; the row itself stays
/// forever, like its member-side counterpart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicRsvp {
  pub session_id:     Uuid,
  pub attendee_token: String,
  pub attending:      bool,
  pub confirmed_at:   DateTime<Utc>,
}
