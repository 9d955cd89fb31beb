//! [`ParticipationService`] — the entry point callers use to move slots.
//!
//! The store guarantees atomicity; this layer adds the join-window gate,
//! unifies backend errors into [`roster_core::Error`], logs transitions and
//! feeds the change notifier. Notification happens only after a commit and
//! only for effective transitions, so subscribers never see a state that
//! didn't happen.

use std::sync::Arc;

use chrono::Utc;
use roster_core::{
  Error, NotJoinableReason, Result,
  history::ParticipationEvent,
  participant::{Participant, ParticipationRecord, PublicRsvp},
  session::{NewSession, Session, SessionStatus},
  snapshot::CapacitySnapshot,
  store::{JoinOutcome, LeaveOutcome, SessionStore},
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{gate::JoinGate, notifier::ChangeNotifier};

pub struct ParticipationService<S> {
  store:    Arc<S>,
  gate:     Arc<dyn JoinGate>,
  notifier: Arc<ChangeNotifier>,
}

impl<S> Clone for ParticipationService<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      gate:     Arc::clone(&self.gate),
      notifier: Arc::clone(&self.notifier),
    }
  }
}

impl<S: SessionStore> ParticipationService<S> {
  pub fn new(store: Arc<S>, gate: Arc<dyn JoinGate>, notifier: ChangeNotifier) -> Self {
    Self {
      store,
      gate,
      notifier: Arc::new(notifier),
    }
  }

  // ── Session boundary ──────────────────────────────────────────────────────

  pub async fn create_session(&self, input: NewSession) -> Result<Session> {
    let session = self
      .store
      .create_session(input)
      .await
      .map_err(Into::into)?;
    tracing::info!(
      session_id = %session.session_id,
      capacity = session.capacity,
      "session created"
    );
    Ok(session)
  }

  pub async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>> {
    self.store.get_session(session_id).await.map_err(Into::into)
  }

  pub async fn set_status(&self, session_id: Uuid, status: SessionStatus) -> Result<Session> {
    let session = self
      .store
      .set_status(session_id, status)
      .await
      .map_err(Into::into)?;
    tracing::info!(%session_id, status = status.as_str(), "session status changed");
    Ok(session)
  }

  /// Change capacity and broadcast the resulting snapshot — availability
  /// moves even though no participant did.
  pub async fn set_capacity(&self, session_id: Uuid, capacity: i64) -> Result<Session> {
    let session = self
      .store
      .set_capacity(session_id, capacity)
      .await
      .map_err(Into::into)?;
    tracing::info!(%session_id, capacity, "session capacity changed");

    let snapshot = self.store.snapshot(session_id).await.map_err(Into::into)?;
    self.notifier.publish(session_id, snapshot);
    Ok(session)
  }

  // ── Participation ─────────────────────────────────────────────────────────

  /// Admit a participant against free capacity.
  ///
  /// Refusals come in layers: the join-window gate first, then the store's
  /// own status, idempotence and capacity checks inside its transaction.
  pub async fn request_join(
    &self,
    session_id: Uuid,
    participant: Participant,
  ) -> Result<JoinOutcome> {
    let session = self
      .store
      .get_session(session_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::SessionNotFound(session_id))?;

    if !self.gate.allows_join(&session, Utc::now()) {
      tracing::debug!(%session_id, "join refused: window closed");
      return Err(Error::SessionNotJoinable {
        session_id,
        reason: NotJoinableReason::Cutoff,
      });
    }

    let outcome = self
      .store
      .join(session_id, participant.clone())
      .await
      .map_err(|e| self.surface(session_id, e))?;

    if outcome.newly_joined {
      tracing::info!(
        %session_id,
        kind = participant.kind().as_str(),
        used = outcome.snapshot.used,
        available = outcome.snapshot.available,
        "participant joined"
      );
      self.notifier.publish(session_id, outcome.snapshot.clone());
    } else {
      tracing::debug!(%session_id, "join was a no-op");
    }

    Ok(outcome)
  }

  /// Release a participant's slot. Never gated, never capacity-checked.
  pub async fn request_leave(
    &self,
    session_id: Uuid,
    participant: Participant,
  ) -> Result<LeaveOutcome> {
    let outcome = self
      .store
      .leave(session_id, participant.clone())
      .await
      .map_err(|e| self.surface(session_id, e))?;

    if outcome.newly_left {
      tracing::info!(
        %session_id,
        kind = participant.kind().as_str(),
        used = outcome.snapshot.used,
        available = outcome.snapshot.available,
        "participant left"
      );
      self.notifier.publish(session_id, outcome.snapshot.clone());
    } else {
      tracing::debug!(%session_id, "leave was a no-op");
    }

    Ok(outcome)
  }

  /// Convert a backend error, logging the retryable contention case.
  fn surface(&self, session_id: Uuid, e: S::Error) -> Error {
    let e: Error = e.into();
    if let Error::Conflict(reason) = &e {
      tracing::warn!(%session_id, %reason, "write contention, caller should retry");
    }
    e
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn snapshot(&self, session_id: Uuid) -> Result<CapacitySnapshot> {
    self.store.snapshot(session_id).await.map_err(Into::into)
  }

  pub async fn list_active_members(&self, session_id: Uuid) -> Result<Vec<Uuid>> {
    self
      .store
      .list_active_members(session_id)
      .await
      .map_err(Into::into)
  }

  pub async fn list_active_attendees(&self, session_id: Uuid) -> Result<Vec<String>> {
    self
      .store
      .list_active_attendees(session_id)
      .await
      .map_err(Into::into)
  }

  pub async fn member_record(
    &self,
    session_id: Uuid,
    member_id: Uuid,
  ) -> Result<Option<ParticipationRecord>> {
    self
      .store
      .member_record(session_id, member_id)
      .await
      .map_err(Into::into)
  }

  pub async fn rsvp_record(
    &self,
    session_id: Uuid,
    attendee_token: &str,
  ) -> Result<Option<PublicRsvp>> {
    self
      .store
      .rsvp_record(session_id, attendee_token)
      .await
      .map_err(Into::into)
  }

  pub async fn history(&self, session_id: Uuid) -> Result<Vec<ParticipationEvent>> {
    self.store.history(session_id).await.map_err(Into::into)
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  /// Subscribe to committed snapshot changes for one session.
  pub fn subscribe(&self, session_id: Uuid) -> broadcast::Receiver<CapacitySnapshot> {
    self.notifier.subscribe(session_id)
  }
}
