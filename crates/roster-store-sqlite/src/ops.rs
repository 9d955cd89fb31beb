//! Row-level SQL helpers composed inside the store's transactions.
//!
//! Everything here takes a plain [`rusqlite::Connection`] (a `Transaction`
//! derefs to one) and returns `rusqlite::Result`, so helpers chain with `?`
//! inside `conn.call` closures. Decisions that need decoded domain types are
//! carried out of the closure as verdicts, in the same spirit as the `Raw*`
//! row types in [`crate::encode`].

use chrono::{DateTime, Utc};
use roster_core::{
  history::TransitionAction,
  participant::Participant,
  session::SessionStatus,
  snapshot::CapacitySnapshot,
};
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use crate::encode::{encode_dt, encode_uuid, RawSession};

// ─── Verdicts ────────────────────────────────────────────────────────────────

/// Outcome of [`join_in_tx`]. Only `Admitted` wrote anything; the caller
/// commits for `Admitted` and lets every other arm roll back.
pub enum JoinVerdict {
  Admitted(CapacitySnapshot),
  AlreadyIn(CapacitySnapshot),
  Full { capacity: i64 },
  /// Raw status text; decoded into a domain error outside the closure.
  NotJoinable { status: String },
  Missing,
}

/// Outcome of [`leave_in_tx`]. A leave never refuses; the caller commits
/// when `newly_left` is set.
pub enum LeaveVerdict {
  Done {
    snapshot:   CapacitySnapshot,
    newly_left: bool,
  },
  Missing,
}

/// Outcome of a guarded capacity update.
pub enum CapacityVerdict {
  Updated(RawSession),
  BelowUsage { used: i64 },
  Missing,
}

// ─── Session rows ────────────────────────────────────────────────────────────

/// The slice of a `sessions` row that participation decisions read while
/// holding the write lock. Status stays raw text in here.
pub struct GateRow {
  pub capacity: i64,
  pub status:   String,
  pub version:  i64,
}

pub fn gate_row(conn: &Connection, session_id: Uuid) -> rusqlite::Result<Option<GateRow>> {
  conn
    .query_row(
      "SELECT capacity, status, version FROM sessions WHERE session_id = ?1",
      rusqlite::params![encode_uuid(session_id)],
      |row| {
        Ok(GateRow {
          capacity: row.get(0)?,
          status:   row.get(1)?,
          version:  row.get(2)?,
        })
      },
    )
    .optional()
}

pub fn load_raw_session(
  conn: &Connection,
  session_id: Uuid,
) -> rusqlite::Result<Option<RawSession>> {
  conn
    .query_row(
      "SELECT session_id, owner_id, capacity, starts_at, status, version, created_at
       FROM sessions WHERE session_id = ?1",
      rusqlite::params![encode_uuid(session_id)],
      |row| {
        Ok(RawSession {
          session_id: row.get(0)?,
          owner_id:   row.get(1)?,
          capacity:   row.get(2)?,
          starts_at:  row.get(3)?,
          status:     row.get(4)?,
          version:    row.get(5)?,
          created_at: row.get(6)?,
        })
      },
    )
    .optional()
}

pub fn set_version(conn: &Connection, session_id: Uuid, version: i64) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE sessions SET version = ?2 WHERE session_id = ?1",
    rusqlite::params![encode_uuid(session_id), version],
  )?;
  Ok(())
}

pub fn update_capacity(
  conn: &Connection,
  session_id: Uuid,
  capacity: i64,
  version: i64,
) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE sessions SET capacity = ?2, version = ?3 WHERE session_id = ?1",
    rusqlite::params![encode_uuid(session_id), capacity, version],
  )?;
  Ok(())
}

pub fn update_status(
  conn: &Connection,
  session_id: Uuid,
  status: SessionStatus,
) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE sessions SET status = ?2 WHERE session_id = ?1",
    rusqlite::params![encode_uuid(session_id), status.as_str()],
  )
}

// ─── Active-slot predicates and counts ───────────────────────────────────────

pub fn member_is_active(
  conn: &Connection,
  session_id: Uuid,
  member_id: Uuid,
) -> rusqlite::Result<bool> {
  let state: Option<String> = conn
    .query_row(
      "SELECT state FROM participations WHERE session_id = ?1 AND member_id = ?2",
      rusqlite::params![encode_uuid(session_id), encode_uuid(member_id)],
      |row| row.get(0),
    )
    .optional()?;
  Ok(state.as_deref() == Some("joined"))
}

pub fn rsvp_is_active(
  conn: &Connection,
  session_id: Uuid,
  attendee_token: &str,
) -> rusqlite::Result<bool> {
  let attending: Option<bool> = conn
    .query_row(
      "SELECT attending FROM public_rsvps
       WHERE session_id = ?1 AND attendee_token = ?2",
      rusqlite::params![encode_uuid(session_id), attendee_token],
      |row| row.get(0),
    )
    .optional()?;
  Ok(attending.unwrap_or(false))
}

pub fn is_active(
  conn: &Connection,
  session_id: Uuid,
  participant: &Participant,
) -> rusqlite::Result<bool> {
  match participant {
    Participant::Member(member_id) => member_is_active(conn, session_id, *member_id),
    Participant::Attendee(token) => rsvp_is_active(conn, session_id, token),
  }
}

/// `(private, public)` active-slot counts for one session.
pub fn active_counts(conn: &Connection, session_id: Uuid) -> rusqlite::Result<(i64, i64)> {
  let id_str = encode_uuid(session_id);

  let private: i64 = conn.query_row(
    "SELECT COUNT(*) FROM participations WHERE session_id = ?1 AND state = 'joined'",
    rusqlite::params![id_str],
    |row| row.get(0),
  )?;

  let public: i64 = conn.query_row(
    "SELECT COUNT(*) FROM public_rsvps WHERE session_id = ?1 AND attending = 1",
    rusqlite::params![id_str],
    |row| row.get(0),
  )?;

  Ok((private, public))
}

pub fn snapshot_for(
  conn: &Connection,
  session_id: Uuid,
  capacity: i64,
  version: i64,
) -> rusqlite::Result<CapacitySnapshot> {
  let (private, public) = active_counts(conn, session_id)?;
  Ok(CapacitySnapshot::derive(
    session_id, capacity, version, private, public,
  ))
}

// ─── Record writes ───────────────────────────────────────────────────────────

/// Insert a joined record, or flip an existing left record back to joined.
/// The caller has already established that the pair is not currently active.
pub fn upsert_member_joined(
  conn: &Connection,
  session_id: Uuid,
  member_id: Uuid,
  now: DateTime<Utc>,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO participations (session_id, member_id, state, joined_at, left_at)
     VALUES (?1, ?2, 'joined', ?3, NULL)
     ON CONFLICT (session_id, member_id)
     DO UPDATE SET state = 'joined', joined_at = excluded.joined_at, left_at = NULL",
    rusqlite::params![encode_uuid(session_id), encode_uuid(member_id), encode_dt(now)],
  )?;
  Ok(())
}

/// Flip an active member record to left. Returns whether a slot was released.
pub fn mark_member_left(
  conn: &Connection,
  session_id: Uuid,
  member_id: Uuid,
  now: DateTime<Utc>,
) -> rusqlite::Result<bool> {
  let changed = conn.execute(
    "UPDATE participations SET state = 'left', left_at = ?3
     WHERE session_id = ?1 AND member_id = ?2 AND state = 'joined'",
    rusqlite::params![encode_uuid(session_id), encode_uuid(member_id), encode_dt(now)],
  )?;
  Ok(changed > 0)
}

pub fn upsert_rsvp_attending(
  conn: &Connection,
  session_id: Uuid,
  attendee_token: &str,
  now: DateTime<Utc>,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO public_rsvps (session_id, attendee_token, attending, confirmed_at)
     VALUES (?1, ?2, 1, ?3)
     ON CONFLICT (session_id, attendee_token)
     DO UPDATE SET attending = 1, confirmed_at = excluded.confirmed_at",
    rusqlite::params![encode_uuid(session_id), attendee_token, encode_dt(now)],
  )?;
  Ok(())
}

/// Flip an active RSVP to not attending. Absent rows stay absent: cancelling
/// an RSVP that was never made must not invent a record.
pub fn mark_rsvp_cancelled(
  conn: &Connection,
  session_id: Uuid,
  attendee_token: &str,
) -> rusqlite::Result<bool> {
  let changed = conn.execute(
    "UPDATE public_rsvps SET attending = 0
     WHERE session_id = ?1 AND attendee_token = ?2 AND attending = 1",
    rusqlite::params![encode_uuid(session_id), attendee_token],
  )?;
  Ok(changed > 0)
}

pub fn append_event(
  conn: &Connection,
  session_id: Uuid,
  participant: &Participant,
  action: TransitionAction,
  now: DateTime<Utc>,
  version: i64,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO participation_log
       (event_id, session_id, actor, kind, action, recorded_at, version)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_uuid(Uuid::new_v4()),
      encode_uuid(session_id),
      participant.actor_id(),
      participant.kind().as_str(),
      action.as_str(),
      encode_dt(now),
      version,
    ],
  )?;
  Ok(())
}

// ─── Transactional compositions ──────────────────────────────────────────────

/// The join algorithm, run while holding SQLite's write lock.
///
/// Order matters: status gate, then idempotence, then the capacity check,
/// and only then the writes. Everything between `BEGIN IMMEDIATE` and commit
/// sees and produces one consistent state, which is the no-overbooking
/// guarantee.
pub fn join_in_tx(
  conn: &Connection,
  session_id: Uuid,
  participant: &Participant,
  now: DateTime<Utc>,
) -> rusqlite::Result<JoinVerdict> {
  let Some(gate) = gate_row(conn, session_id)? else {
    return Ok(JoinVerdict::Missing);
  };

  match SessionStatus::parse_str(&gate.status) {
    Some(status) if status.is_joinable() => {}
    // Unknown status text also refuses; the caller surfaces it on decode.
    _ => return Ok(JoinVerdict::NotJoinable { status: gate.status }),
  }

  if is_active(conn, session_id, participant)? {
    let snapshot = snapshot_for(conn, session_id, gate.capacity, gate.version)?;
    return Ok(JoinVerdict::AlreadyIn(snapshot));
  }

  let (private, public) = active_counts(conn, session_id)?;
  if private + public >= gate.capacity {
    return Ok(JoinVerdict::Full {
      capacity: gate.capacity,
    });
  }

  match participant {
    Participant::Member(member_id) => {
      upsert_member_joined(conn, session_id, *member_id, now)?
    }
    Participant::Attendee(token) => {
      upsert_rsvp_attending(conn, session_id, token, now)?
    }
  }

  let version = gate.version + 1;
  set_version(conn, session_id, version)?;
  append_event(conn, session_id, participant, TransitionAction::Join, now, version)?;

  let snapshot = snapshot_for(conn, session_id, gate.capacity, version)?;
  Ok(JoinVerdict::Admitted(snapshot))
}

/// The leave algorithm. No status gate and no capacity involvement; a leave
/// that finds no active slot reports `newly_left: false` and writes nothing.
pub fn leave_in_tx(
  conn: &Connection,
  session_id: Uuid,
  participant: &Participant,
  now: DateTime<Utc>,
) -> rusqlite::Result<LeaveVerdict> {
  let Some(gate) = gate_row(conn, session_id)? else {
    return Ok(LeaveVerdict::Missing);
  };

  let released = match participant {
    Participant::Member(member_id) => {
      mark_member_left(conn, session_id, *member_id, now)?
    }
    Participant::Attendee(token) => mark_rsvp_cancelled(conn, session_id, token)?,
  };

  let version = if released {
    let version = gate.version + 1;
    set_version(conn, session_id, version)?;
    append_event(conn, session_id, participant, TransitionAction::Leave, now, version)?;
    version
  } else {
    gate.version
  };

  let snapshot = snapshot_for(conn, session_id, gate.capacity, version)?;
  Ok(LeaveVerdict::Done {
    snapshot,
    newly_left: released,
  })
}
