//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Enum columns store the `as_str` form of the
//! core type, so the strings here and the serde wire form always agree.

use chrono::{DateTime, Utc};
use roster_core::{
  history::{ParticipationEvent, TransitionAction},
  participant::{ParticipantKind, ParticipationRecord, ParticipationState, PublicRsvp},
  session::{Session, SessionStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enum columns ────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<SessionStatus> {
  SessionStatus::parse_str(s)
    .ok_or_else(|| Error::Decode(format!("unknown session status: {s:?}")))
}

pub fn decode_state(s: &str) -> Result<ParticipationState> {
  ParticipationState::parse_str(s)
    .ok_or_else(|| Error::Decode(format!("unknown participation state: {s:?}")))
}

pub fn decode_kind(s: &str) -> Result<ParticipantKind> {
  ParticipantKind::parse_str(s)
    .ok_or_else(|| Error::Decode(format!("unknown participant kind: {s:?}")))
}

pub fn decode_action(s: &str) -> Result<TransitionAction> {
  TransitionAction::parse_str(s)
    .ok_or_else(|| Error::Decode(format!("unknown transition action: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `sessions` row.
pub struct RawSession {
  pub session_id: String,
  pub owner_id:   String,
  pub capacity:   i64,
  pub starts_at:  String,
  pub status:     String,
  pub version:    i64,
  pub created_at: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      session_id: decode_uuid(&self.session_id)?,
      owner_id:   decode_uuid(&self.owner_id)?,
      capacity:   self.capacity,
      starts_at:  decode_dt(&self.starts_at)?,
      status:     decode_status(&self.status)?,
      version:    self.version,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `participations` row.
pub struct RawParticipation {
  pub session_id: String,
  pub member_id:  String,
  pub state:      String,
  pub joined_at:  String,
  pub left_at:    Option<String>,
}

impl RawParticipation {
  pub fn into_record(self) -> Result<ParticipationRecord> {
    Ok(ParticipationRecord {
      session_id: decode_uuid(&self.session_id)?,
      member_id:  decode_uuid(&self.member_id)?,
      state:      decode_state(&self.state)?,
      joined_at:  decode_dt(&self.joined_at)?,
      left_at:    self.left_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read directly from a `public_rsvps` row.
pub struct RawRsvp {
  pub session_id:     String,
  pub attendee_token: String,
  pub attending:      bool,
  pub confirmed_at:   String,
}

impl RawRsvp {
  pub fn into_rsvp(self) -> Result<PublicRsvp> {
    Ok(PublicRsvp {
      session_id:     decode_uuid(&self.session_id)?,
      attendee_token: self.attendee_token,
      attending:      self.attending,
      confirmed_at:   decode_dt(&self.confirmed_at)?,
    })
  }
}

/// Raw values read directly from a `participation_log` row.
pub struct RawEvent {
  pub event_id:    String,
  pub session_id:  String,
  pub actor:       String,
  pub kind:        String,
  pub action:      String,
  pub recorded_at: String,
  pub version:     i64,
}

impl RawEvent {
  pub fn into_event(self) -> Result<ParticipationEvent> {
    Ok(ParticipationEvent {
      event_id:    decode_uuid(&self.event_id)?,
      session_id:  decode_uuid(&self.session_id)?,
      actor:       self.actor,
      kind:        decode_kind(&self.kind)?,
      action:      decode_action(&self.action)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      version:     self.version,
    })
  }
}
