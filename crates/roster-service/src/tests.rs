//! Service-level tests over the SQLite backend.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use roster_core::{
  Error, NotJoinableReason,
  participant::Participant,
  session::{NewSession, Session, SessionStatus},
};
use roster_store_sqlite::SqliteStore;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

use crate::{ChangeNotifier, CutoffGate, OpenGate, ParticipationService};

async fn service() -> ParticipationService<SqliteStore> {
  service_with(Arc::new(OpenGate), ChangeNotifier::default()).await
}

async fn service_with(
  gate: Arc<dyn crate::JoinGate>,
  notifier: ChangeNotifier,
) -> ParticipationService<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  ParticipationService::new(Arc::new(store), gate, notifier)
}

fn new_session(capacity: i64) -> NewSession {
  NewSession {
    owner_id:  Uuid::new_v4(),
    capacity,
    starts_at: Utc::now() + Duration::hours(2),
  }
}

fn member() -> Participant {
  Participant::Member(Uuid::new_v4())
}

// ─── Core flow ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn join_then_snapshot_through_the_service() {
  let svc = service().await;
  let session = svc.create_session(new_session(4)).await.unwrap();

  let outcome = svc.request_join(session.session_id, member()).await.unwrap();
  assert!(outcome.newly_joined);

  let snap = svc.snapshot(session.session_id).await.unwrap();
  assert_eq!(snap.used, 1);
  assert_eq!(snap.available, 3);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
  let svc = service().await;
  let err = svc.request_join(Uuid::new_v4(), member()).await.unwrap_err();
  assert!(matches!(err, Error::SessionNotFound(_)));
}

#[tokio::test]
async fn records_and_history_reflect_the_transitions() {
  let svc = service().await;
  let session = svc.create_session(new_session(4)).await.unwrap();
  let sid = session.session_id;

  let member_id = Uuid::new_v4();
  svc
    .request_join(sid, Participant::Member(member_id))
    .await
    .unwrap();
  svc
    .request_join(sid, Participant::Attendee("tok-1".into()))
    .await
    .unwrap();
  svc
    .request_leave(sid, Participant::Attendee("tok-1".into()))
    .await
    .unwrap();

  let record = svc.member_record(sid, member_id).await.unwrap().unwrap();
  assert!(record.state.is_joined());
  assert!(record.left_at.is_none());

  let rsvp = svc.rsvp_record(sid, "tok-1").await.unwrap().unwrap();
  assert!(!rsvp.attending);

  let history = svc.history(sid).await.unwrap();
  let actors: Vec<_> = history.iter().map(|e| e.actor.as_str()).collect();
  assert_eq!(actors, [member_id.to_string().as_str(), "tok-1", "tok-1"]);
  assert_eq!(history[2].version, 3);
}

// ─── Gate layering ───────────────────────────────────────────────────────────

#[tokio::test]
async fn closed_join_window_refuses_with_cutoff_reason() {
  let svc = service_with(
    Arc::new(CutoffGate::new(Duration::minutes(15))),
    ChangeNotifier::default(),
  )
  .await;

  let session = svc
    .create_session(NewSession {
      owner_id:  Uuid::new_v4(),
      capacity:  4,
      starts_at: Utc::now() - Duration::hours(1),
    })
    .await
    .unwrap();

  let err = svc.request_join(session.session_id, member()).await.unwrap_err();
  assert!(matches!(
    err,
    Error::SessionNotJoinable {
      reason: NotJoinableReason::Cutoff,
      ..
    }
  ));

  // The refusal happened before the store transaction; nothing changed.
  let snap = svc.snapshot(session.session_id).await.unwrap();
  assert_eq!(snap.used, 0);
  assert_eq!(snap.version, 0);
}

#[tokio::test]
async fn cancelled_session_refuses_with_status_reason() {
  let svc = service().await;
  let session = svc.create_session(new_session(4)).await.unwrap();
  svc
    .set_status(session.session_id, SessionStatus::Cancelled)
    .await
    .unwrap();

  let err = svc.request_join(session.session_id, member()).await.unwrap_err();
  assert!(matches!(
    err,
    Error::SessionNotJoinable {
      reason: NotJoinableReason::Status(SessionStatus::Cancelled),
      ..
    }
  ));
}

#[tokio::test]
async fn leave_ignores_the_join_window() {
  struct ShutGate;
  impl crate::JoinGate for ShutGate {
    fn allows_join(&self, _session: &Session, _now: DateTime<Utc>) -> bool {
      false
    }
  }

  // Same store behind two services: one that admits, one whose window is
  // closed for good.
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let open = ParticipationService::new(
    Arc::clone(&store),
    Arc::new(OpenGate),
    ChangeNotifier::default(),
  );
  let shut =
    ParticipationService::new(store, Arc::new(ShutGate), ChangeNotifier::default());

  let session = open.create_session(new_session(2)).await.unwrap();
  let alice = member();
  open
    .request_join(session.session_id, alice.clone())
    .await
    .unwrap();

  let err = shut.request_join(session.session_id, member()).await.unwrap_err();
  assert!(matches!(err, Error::SessionNotJoinable { .. }));

  let outcome = shut.request_leave(session.session_id, alice).await.unwrap();
  assert!(outcome.newly_left);
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn joins_publish_snapshots_to_subscribers() {
  let svc = service().await;
  let session = svc.create_session(new_session(4)).await.unwrap();

  let mut rx = svc.subscribe(session.session_id);
  svc.request_join(session.session_id, member()).await.unwrap();

  let snap = rx.recv().await.unwrap();
  assert_eq!(snap.used, 1);
  assert_eq!(snap.version, 1);
}

#[tokio::test]
async fn noop_transitions_publish_nothing() {
  let svc = service().await;
  let session = svc.create_session(new_session(4)).await.unwrap();
  let alice = member();

  let mut rx = svc.subscribe(session.session_id);

  svc
    .request_join(session.session_id, alice.clone())
    .await
    .unwrap();
  rx.recv().await.unwrap();

  // Idempotent repeat and a no-op leave: the channel stays quiet.
  svc
    .request_join(session.session_id, alice.clone())
    .await
    .unwrap();
  svc.request_leave(session.session_id, member()).await.unwrap();
  assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

  // An effective leave publishes again.
  svc.request_leave(session.session_id, alice).await.unwrap();
  let snap = rx.recv().await.unwrap();
  assert_eq!(snap.used, 0);
}

#[tokio::test]
async fn snapshots_arrive_in_version_order() {
  let svc = service().await;
  let session = svc.create_session(new_session(4)).await.unwrap();
  let alice = member();

  let mut rx = svc.subscribe(session.session_id);

  svc
    .request_join(session.session_id, alice.clone())
    .await
    .unwrap();
  svc.request_join(session.session_id, member()).await.unwrap();
  svc.request_leave(session.session_id, alice).await.unwrap();

  let versions = [
    rx.recv().await.unwrap().version,
    rx.recv().await.unwrap().version,
    rx.recv().await.unwrap().version,
  ];
  assert_eq!(versions, [1, 2, 3]);
}

#[tokio::test]
async fn capacity_edits_publish_the_new_availability() {
  let svc = service().await;
  let session = svc.create_session(new_session(4)).await.unwrap();

  let mut rx = svc.subscribe(session.session_id);
  svc.set_capacity(session.session_id, 9).await.unwrap();

  let snap = rx.recv().await.unwrap();
  assert_eq!(snap.capacity, 9);
  assert_eq!(snap.available, 9);
}

#[tokio::test]
async fn lagged_subscriber_skips_to_newest() {
  let svc = service_with(Arc::new(OpenGate), ChangeNotifier::new(1)).await;
  let session = svc.create_session(new_session(8)).await.unwrap();

  let mut rx = svc.subscribe(session.session_id);
  for _ in 0..3 {
    svc.request_join(session.session_id, member()).await.unwrap();
  }

  // Two snapshots were dropped; delivery is best-effort by contract.
  assert!(matches!(
    rx.try_recv(),
    Err(TryRecvError::Lagged(_))
  ));
  let snap = rx.try_recv().unwrap();
  assert_eq!(snap.version, 3);
}
