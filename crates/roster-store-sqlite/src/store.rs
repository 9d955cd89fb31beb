//! [`SqliteStore`] — the SQLite implementation of [`SessionStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use roster_core::{
  error::NotJoinableReason,
  history::ParticipationEvent,
  participant::{Participant, ParticipationRecord, PublicRsvp},
  session::{NewSession, Session, SessionStatus},
  snapshot::CapacitySnapshot,
  store::{JoinOutcome, LeaveOutcome, SessionStore},
};

use crate::{
  encode::{
    decode_status, decode_uuid, encode_dt, encode_uuid, RawEvent, RawParticipation,
    RawRsvp, RawSession,
  },
  ops::{self, CapacityVerdict, JoinVerdict, LeaveVerdict},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A roster session store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All slot
/// movements go through `BEGIN IMMEDIATE` transactions on this connection,
/// so two stores opened on the same file contend via SQLite's write lock
/// rather than overbooking each other.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = Error;

  // ── Session boundary ──────────────────────────────────────────────────────

  async fn create_session(&self, input: NewSession) -> Result<Session> {
    if input.capacity < 1 {
      return Err(Error::InvalidCapacity(input.capacity));
    }

    let session = Session {
      session_id: Uuid::new_v4(),
      owner_id:   input.owner_id,
      capacity:   input.capacity,
      starts_at:  input.starts_at,
      status:     SessionStatus::Scheduled,
      version:    0,
      created_at: Utc::now(),
    };

    let id_str       = encode_uuid(session.session_id);
    let owner_str    = encode_uuid(session.owner_id);
    let capacity     = session.capacity;
    let starts_str   = encode_dt(session.starts_at);
    let status_str   = session.status.as_str();
    let created_str  = encode_dt(session.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions
             (session_id, owner_id, capacity, starts_at, status, version, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
          rusqlite::params![id_str, owner_str, capacity, starts_str, status_str, created_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(session)
  }

  async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| Ok(ops::load_raw_session(conn, id)?))
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<Session> {
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if ops::update_status(&tx, id, status)? == 0 {
          return Ok(None);
        }
        let raw = ops::load_raw_session(&tx, id)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw
      .ok_or(Error::SessionNotFound(id))?
      .into_session()
  }

  async fn set_capacity(&self, id: Uuid, capacity: i64) -> Result<Session> {
    if capacity < 1 {
      return Err(Error::InvalidCapacity(capacity));
    }

    let verdict = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(gate) = ops::gate_row(&tx, id)? else {
          return Ok(CapacityVerdict::Missing);
        };

        let (private, public) = ops::active_counts(&tx, id)?;
        let used = private + public;
        if capacity < used {
          return Ok(CapacityVerdict::BelowUsage { used });
        }

        ops::update_capacity(&tx, id, capacity, gate.version + 1)?;
        let raw = ops::load_raw_session(&tx, id)?;
        tx.commit()?;

        match raw {
          Some(raw) => Ok(CapacityVerdict::Updated(raw)),
          None => Ok(CapacityVerdict::Missing),
        }
      })
      .await?;

    match verdict {
      CapacityVerdict::Updated(raw) => raw.into_session(),
      CapacityVerdict::BelowUsage { used } => {
        Err(Error::CapacityBelowUsage { capacity, used })
      }
      CapacityVerdict::Missing => Err(Error::SessionNotFound(id)),
    }
  }

  // ── Participation transitions ─────────────────────────────────────────────

  async fn join(&self, session_id: Uuid, participant: Participant) -> Result<JoinOutcome> {
    let now = Utc::now();

    let verdict = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let verdict = ops::join_in_tx(&tx, session_id, &participant, now)?;
        // Only an admission wrote anything; refusals roll back on drop.
        if let JoinVerdict::Admitted(_) = verdict {
          tx.commit()?;
        }
        Ok(verdict)
      })
      .await?;

    match verdict {
      JoinVerdict::Admitted(snapshot) => Ok(JoinOutcome {
        snapshot,
        newly_joined: true,
      }),
      JoinVerdict::AlreadyIn(snapshot) => Ok(JoinOutcome {
        snapshot,
        newly_joined: false,
      }),
      JoinVerdict::Full { capacity } => Err(Error::CapacityExceeded {
        session_id,
        capacity,
      }),
      JoinVerdict::NotJoinable { status } => Err(Error::SessionNotJoinable {
        session_id,
        reason: NotJoinableReason::Status(decode_status(&status)?),
      }),
      JoinVerdict::Missing => Err(Error::SessionNotFound(session_id)),
    }
  }

  async fn leave(&self, session_id: Uuid, participant: Participant) -> Result<LeaveOutcome> {
    let now = Utc::now();

    let verdict = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let verdict = ops::leave_in_tx(&tx, session_id, &participant, now)?;
        if let LeaveVerdict::Done { newly_left: true, .. } = verdict {
          tx.commit()?;
        }
        Ok(verdict)
      })
      .await?;

    match verdict {
      LeaveVerdict::Done {
        snapshot,
        newly_left,
      } => Ok(LeaveOutcome {
        snapshot,
        newly_left,
      }),
      LeaveVerdict::Missing => Err(Error::SessionNotFound(session_id)),
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn snapshot(&self, session_id: Uuid) -> Result<CapacitySnapshot> {
    let snap: Option<CapacitySnapshot> = self
      .conn
      .call(move |conn| {
        // Deferred transaction: both the session row and the counts come
        // from one consistent view of committed state.
        let tx = conn.transaction()?;
        let Some(gate) = ops::gate_row(&tx, session_id)? else {
          return Ok(None);
        };
        let snap = ops::snapshot_for(&tx, session_id, gate.capacity, gate.version)?;
        tx.commit()?;
        Ok(Some(snap))
      })
      .await?;

    snap.ok_or(Error::SessionNotFound(session_id))
  }

  async fn list_active_members(&self, session_id: Uuid) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT member_id FROM participations
           WHERE session_id = ?1 AND state = 'joined'
           ORDER BY joined_at ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![encode_uuid(session_id)], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn list_active_attendees(&self, session_id: Uuid) -> Result<Vec<String>> {
    let tokens: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT attendee_token FROM public_rsvps
           WHERE session_id = ?1 AND attending = 1
           ORDER BY confirmed_at ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![encode_uuid(session_id)], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(tokens)
  }

  async fn member_record(
    &self,
    session_id: Uuid,
    member_id: Uuid,
  ) -> Result<Option<ParticipationRecord>> {
    let raw: Option<RawParticipation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT session_id, member_id, state, joined_at, left_at
               FROM participations WHERE session_id = ?1 AND member_id = ?2",
              rusqlite::params![encode_uuid(session_id), encode_uuid(member_id)],
              |row| {
                Ok(RawParticipation {
                  session_id: row.get(0)?,
                  member_id:  row.get(1)?,
                  state:      row.get(2)?,
                  joined_at:  row.get(3)?,
                  left_at:    row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawParticipation::into_record).transpose()
  }

  async fn rsvp_record(
    &self,
    session_id: Uuid,
    attendee_token: &str,
  ) -> Result<Option<PublicRsvp>> {
    let token = attendee_token.to_owned();

    let raw: Option<RawRsvp> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT session_id, attendee_token, attending, confirmed_at
               FROM public_rsvps WHERE session_id = ?1 AND attendee_token = ?2",
              rusqlite::params![encode_uuid(session_id), token],
              |row| {
                Ok(RawRsvp {
                  session_id:     row.get(0)?,
                  attendee_token: row.get(1)?,
                  attending:      row.get(2)?,
                  confirmed_at:   row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRsvp::into_rsvp).transpose()
  }

  async fn history(&self, session_id: Uuid) -> Result<Vec<ParticipationEvent>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, session_id, actor, kind, action, recorded_at, version
           FROM participation_log WHERE session_id = ?1
           ORDER BY version ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![encode_uuid(session_id)], |row| {
            Ok(RawEvent {
              event_id:    row.get(0)?,
              session_id:  row.get(1)?,
              actor:       row.get(2)?,
              kind:        row.get(3)?,
              action:      row.get(4)?,
              recorded_at: row.get(5)?,
              version:     row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }
}
