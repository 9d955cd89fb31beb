//! The `SessionStore` trait and operation outcome types.
//!
//! The trait is implemented by storage backends (e.g. `roster-store-sqlite`).
//! Higher layers (`roster-service`, `roster-api`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  history::ParticipationEvent,
  participant::{Participant, ParticipationRecord, PublicRsvp},
  session::{NewSession, Session, SessionStatus},
  snapshot::CapacitySnapshot,
};

// ─── Outcome types ───────────────────────────────────────────────────────────

/// How a join request was absorbed.
///
/// `newly_joined` is `false` when the participant already held an active
/// slot, in which case nothing was written and `snapshot` simply reflects the
/// current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinOutcome {
  pub snapshot:     CapacitySnapshot,
  pub newly_joined: bool,
}

/// How a leave request was absorbed. Mirrors [`JoinOutcome`]: `newly_left`
/// is `false` when there was no active slot to release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveOutcome {
  pub snapshot:   CapacitySnapshot,
  pub newly_left: bool,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a roster storage backend.
///
/// [`join`](Self::join) and [`leave`](Self::leave) are the only operations
/// that move slots, and implementations must make each one atomic: the
/// capacity check, the record write, the version bump and the log append all
/// commit together or not at all. That is the whole defence against
/// overbooking, so it lives in the store, not in callers.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Session boundary ──────────────────────────────────────────────────

  /// Create and persist a new session in `Scheduled` status with version 0.
  ///
  /// Returns [`InvalidCapacity`](crate::Error::InvalidCapacity) if the
  /// requested capacity is below 1.
  fn create_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Retrieve a session by id. Returns `None` if not found.
  fn get_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// Replace the session status and return the updated session.
  ///
  /// Status is owned by the scheduling layer; the store applies whatever it
  /// is told and only enforces it at join time.
  fn set_status(
    &self,
    id: Uuid,
    status: SessionStatus,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Replace the session capacity and return the updated session.
  ///
  /// Fails with [`CapacityBelowUsage`](crate::Error::CapacityBelowUsage) if
  /// the new capacity is smaller than the current number of held slots. The
  /// check and the write share one transaction.
  fn set_capacity(
    &self,
    id: Uuid,
    capacity: i64,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  // ── Participation transitions ─────────────────────────────────────────

  /// Admit a participant, member or anonymous, against free capacity.
  ///
  /// Idempotent: joining while already active is a no-op that reports
  /// `newly_joined: false`. A full session fails with
  /// [`CapacityExceeded`](crate::Error::CapacityExceeded); a session whose
  /// status is not joinable fails with
  /// [`SessionNotJoinable`](crate::Error::SessionNotJoinable).
  fn join(
    &self,
    session_id: Uuid,
    participant: Participant,
  ) -> impl Future<Output = Result<JoinOutcome, Self::Error>> + Send + '_;

  /// Release a participant's slot.
  ///
  /// Never capacity-constrained and honoured in every session status.
  /// Idempotent: leaving without an active slot is a no-op that reports
  /// `newly_left: false` and creates no record.
  fn leave(
    &self,
    session_id: Uuid,
    participant: Participant,
  ) -> impl Future<Output = Result<LeaveOutcome, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Compute the capacity snapshot for a session from committed state.
  fn snapshot(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<CapacitySnapshot, Self::Error>> + Send + '_;

  /// Member ids currently holding slots, oldest join first.
  fn list_active_members(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Attendee tokens currently holding slots, oldest confirmation first.
  fn list_active_attendees(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// The durable record for one member, in whatever state. `None` if the
  /// member never joined this session.
  fn member_record(
    &self,
    session_id: Uuid,
    member_id: Uuid,
  ) -> impl Future<Output = Result<Option<ParticipationRecord>, Self::Error>> + Send + '_;

  /// The durable RSVP record for one attendee token. `None` if the token
  /// never confirmed for this session.
  fn rsvp_record<'a>(
    &'a self,
    session_id: Uuid,
    attendee_token: &'a str,
  ) -> impl Future<Output = Result<Option<PublicRsvp>, Self::Error>> + Send + 'a;

  /// The transition log for a session, in commit order.
  fn history(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ParticipationEvent>, Self::Error>> + Send + '_;
}
