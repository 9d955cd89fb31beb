//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use roster_core::{
  history::TransitionAction,
  participant::{Participant, ParticipantKind, ParticipationState},
  session::{NewSession, SessionStatus},
  store::SessionStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
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

fn attendee(token: &str) -> Participant {
  Participant::Attendee(token.to_owned())
}

// ─── Session boundary ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_session() {
  let s = store().await;

  let session = s.create_session(new_session(8)).await.unwrap();
  assert_eq!(session.capacity, 8);
  assert_eq!(session.status, SessionStatus::Scheduled);
  assert_eq!(session.version, 0);

  let fetched = s.get_session(session.session_id).await.unwrap().unwrap();
  assert_eq!(fetched.session_id, session.session_id);
  assert_eq!(fetched.owner_id, session.owner_id);
  assert_eq!(fetched.capacity, 8);
}

#[tokio::test]
async fn get_session_missing_returns_none() {
  let s = store().await;
  assert!(s.get_session(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn create_session_rejects_non_positive_capacity() {
  let s = store().await;
  let err = s.create_session(new_session(0)).await.unwrap_err();
  assert!(matches!(err, Error::InvalidCapacity(0)));
}

#[tokio::test]
async fn snapshot_of_unknown_session_errors() {
  let s = store().await;
  let err = s.snapshot(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::SessionNotFound(_)));
}

#[tokio::test]
async fn snapshot_of_empty_session() {
  let s = store().await;
  let session = s.create_session(new_session(5)).await.unwrap();

  let snap = s.snapshot(session.session_id).await.unwrap();
  assert_eq!(snap.capacity, 5);
  assert_eq!(snap.used, 0);
  assert_eq!(snap.available, 5);
  assert_eq!(snap.version, 0);
}

// ─── Member joins ────────────────────────────────────────────────────────────

#[tokio::test]
async fn member_join_takes_a_slot() {
  let s = store().await;
  let session = s.create_session(new_session(3)).await.unwrap();
  let alice = member();

  let outcome = s.join(session.session_id, alice.clone()).await.unwrap();
  assert!(outcome.newly_joined);
  assert_eq!(outcome.snapshot.private_count, 1);
  assert_eq!(outcome.snapshot.used, 1);
  assert_eq!(outcome.snapshot.available, 2);
  assert_eq!(outcome.snapshot.version, 1);

  let Participant::Member(alice_id) = alice else {
    unreachable!()
  };
  let record = s
    .member_record(session.session_id, alice_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(record.state, ParticipationState::Joined);
  assert!(record.left_at.is_none());
}

#[tokio::test]
async fn join_is_idempotent() {
  let s = store().await;
  let session = s.create_session(new_session(3)).await.unwrap();
  let alice = member();

  let Participant::Member(alice_id) = alice.clone() else {
    unreachable!()
  };

  let first = s.join(session.session_id, alice.clone()).await.unwrap();
  let before = s
    .member_record(session.session_id, alice_id)
    .await
    .unwrap()
    .unwrap();

  let second = s.join(session.session_id, alice).await.unwrap();
  let after = s
    .member_record(session.session_id, alice_id)
    .await
    .unwrap()
    .unwrap();

  assert!(first.newly_joined);
  assert!(!second.newly_joined);
  // The repeat wrote nothing: same counts, same version, same record.
  assert_eq!(second.snapshot.used, 1);
  assert_eq!(second.snapshot.version, first.snapshot.version);
  assert_eq!(after.joined_at, before.joined_at);
  assert_eq!(after.state, before.state);
}

#[tokio::test]
async fn leave_then_rejoin_round_trip() {
  let s = store().await;
  let session = s.create_session(new_session(3)).await.unwrap();
  let alice = member();

  s.join(session.session_id, alice.clone()).await.unwrap();
  let left = s.leave(session.session_id, alice.clone()).await.unwrap();
  assert!(left.newly_left);
  assert_eq!(left.snapshot.used, 0);

  let rejoined = s.join(session.session_id, alice.clone()).await.unwrap();
  assert!(rejoined.newly_joined);
  assert_eq!(rejoined.snapshot.used, 1);
  assert_eq!(rejoined.snapshot.version, 3);

  let Participant::Member(alice_id) = alice else {
    unreachable!()
  };
  let record = s
    .member_record(session.session_id, alice_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(record.state, ParticipationState::Joined);
  assert!(record.left_at.is_none());
}

#[tokio::test]
async fn leave_without_join_is_a_noop() {
  let s = store().await;
  let session = s.create_session(new_session(3)).await.unwrap();

  let outcome = s.leave(session.session_id, member()).await.unwrap();
  assert!(!outcome.newly_left);
  assert_eq!(outcome.snapshot.used, 0);
  assert_eq!(outcome.snapshot.version, 0);
}

// ─── Anonymous RSVPs ─────────────────────────────────────────────────────────

#[tokio::test]
async fn rsvp_confirm_and_cancel() {
  let s = store().await;
  let session = s.create_session(new_session(4)).await.unwrap();
  let visitor = attendee("tok-1");

  let joined = s.join(session.session_id, visitor.clone()).await.unwrap();
  assert!(joined.newly_joined);
  assert_eq!(joined.snapshot.public_count, 1);
  assert_eq!(joined.snapshot.private_count, 0);

  let rsvp = s
    .rsvp_record(session.session_id, "tok-1")
    .await
    .unwrap()
    .unwrap();
  assert!(rsvp.attending);

  let cancelled = s.leave(session.session_id, visitor).await.unwrap();
  assert!(cancelled.newly_left);
  assert_eq!(cancelled.snapshot.public_count, 0);

  let rsvp = s
    .rsvp_record(session.session_id, "tok-1")
    .await
    .unwrap()
    .unwrap();
  assert!(!rsvp.attending);
}

#[tokio::test]
async fn rsvp_cancel_without_record_creates_nothing() {
  let s = store().await;
  let session = s.create_session(new_session(4)).await.unwrap();

  let outcome = s
    .leave(session.session_id, attendee("ghost"))
    .await
    .unwrap();
  assert!(!outcome.newly_left);

  let rsvp = s.rsvp_record(session.session_id, "ghost").await.unwrap();
  assert!(rsvp.is_none());
}

#[tokio::test]
async fn rsvp_confirm_is_idempotent() {
  let s = store().await;
  let session = s.create_session(new_session(4)).await.unwrap();
  let visitor = attendee("tok-2");

  let first = s.join(session.session_id, visitor.clone()).await.unwrap();
  let second = s.join(session.session_id, visitor).await.unwrap();

  assert!(first.newly_joined);
  assert!(!second.newly_joined);
  assert_eq!(second.snapshot.public_count, 1);
  assert_eq!(second.snapshot.version, first.snapshot.version);
}

// ─── Capacity enforcement ────────────────────────────────────────────────────

#[tokio::test]
async fn both_kinds_share_one_capacity() {
  let s = store().await;
  let session = s.create_session(new_session(10)).await.unwrap();

  for _ in 0..6 {
    s.join(session.session_id, member()).await.unwrap();
  }
  for i in 0..3 {
    s.join(session.session_id, attendee(&format!("tok-{i}")))
      .await
      .unwrap();
  }

  let snap = s.snapshot(session.session_id).await.unwrap();
  assert_eq!(snap.private_count, 6);
  assert_eq!(snap.public_count, 3);
  assert_eq!(snap.used, 9);
  assert_eq!(snap.available, 1);

  // The tenth join of either kind succeeds...
  let tenth = s
    .join(session.session_id, attendee("tok-last"))
    .await
    .unwrap();
  assert!(tenth.newly_joined);
  assert!(tenth.snapshot.is_full());

  // ...and an eleventh fails, whichever kind attempts it.
  let err = s.join(session.session_id, member()).await.unwrap_err();
  assert!(matches!(err, Error::CapacityExceeded { capacity: 10, .. }));
  let err = s
    .join(session.session_id, attendee("tok-overflow"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::CapacityExceeded { .. }));
}

#[tokio::test]
async fn full_session_admits_again_after_a_leave() {
  let s = store().await;
  let session = s.create_session(new_session(2)).await.unwrap();
  let alice = member();

  s.join(session.session_id, alice.clone()).await.unwrap();
  s.join(session.session_id, member()).await.unwrap();

  let err = s.join(session.session_id, member()).await.unwrap_err();
  assert!(matches!(err, Error::CapacityExceeded { .. }));

  s.leave(session.session_id, alice).await.unwrap();

  let outcome = s.join(session.session_id, member()).await.unwrap();
  assert!(outcome.newly_joined);
  assert!(outcome.snapshot.is_full());
}

#[tokio::test]
async fn leave_is_never_capacity_blocked() {
  let s = store().await;
  let session = s.create_session(new_session(1)).await.unwrap();
  let alice = member();

  s.join(session.session_id, alice.clone()).await.unwrap();
  let snap = s.snapshot(session.session_id).await.unwrap();
  assert!(snap.is_full());

  let outcome = s.leave(session.session_id, alice).await.unwrap();
  assert!(outcome.newly_left);
  assert_eq!(outcome.snapshot.available, 1);
}

#[tokio::test]
async fn concurrent_joins_never_overbook() {
  let s = store().await;
  let session = s.create_session(new_session(3)).await.unwrap();

  let mut tasks = tokio::task::JoinSet::new();
  for _ in 0..8 {
    let store = s.clone();
    let sid = session.session_id;
    tasks.spawn(async move { store.join(sid, member()).await });
  }

  let mut admitted = 0;
  let mut refused = 0;
  while let Some(res) = tasks.join_next().await {
    match res.unwrap() {
      Ok(outcome) => {
        assert!(outcome.newly_joined);
        admitted += 1;
      }
      Err(Error::CapacityExceeded { .. }) => refused += 1,
      Err(other) => panic!("unexpected error: {other}"),
    }
  }

  assert_eq!(admitted, 3);
  assert_eq!(refused, 5);

  let snap = s.snapshot(session.session_id).await.unwrap();
  assert_eq!(snap.used, 3);
  assert_eq!(snap.available, 0);
}

#[tokio::test]
async fn concurrent_joins_across_two_connections() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("roster.db");

  let a = SqliteStore::open(&path).await.unwrap();
  let b = SqliteStore::open(&path).await.unwrap();

  let session = a.create_session(new_session(3)).await.unwrap();

  let mut tasks = tokio::task::JoinSet::new();
  for i in 0..8 {
    let store = if i % 2 == 0 { a.clone() } else { b.clone() };
    let sid = session.session_id;
    tasks.spawn(async move { store.join(sid, member()).await });
  }

  let mut admitted = 0;
  while let Some(res) = tasks.join_next().await {
    match res.unwrap() {
      Ok(outcome) => {
        assert!(outcome.newly_joined);
        admitted += 1;
      }
      Err(Error::CapacityExceeded { .. }) => {}
      // SQLite's write lock may time a writer out under contention; that
      // surfaces as Busy and, crucially, writes nothing.
      Err(Error::Busy(_)) => {}
      Err(other) => panic!("unexpected error: {other}"),
    }
  }

  assert!(admitted <= 3);

  let snap = a.snapshot(session.session_id).await.unwrap();
  assert_eq!(snap.used, admitted);
  assert!(snap.available >= 0);
}

// ─── Status gate ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn joins_refused_once_session_is_not_scheduled() {
  let s = store().await;

  for status in [
    SessionStatus::InProgress,
    SessionStatus::Completed,
    SessionStatus::Cancelled,
  ] {
    let session = s.create_session(new_session(3)).await.unwrap();
    s.set_status(session.session_id, status).await.unwrap();

    let err = s.join(session.session_id, member()).await.unwrap_err();
    assert!(matches!(err, Error::SessionNotJoinable { .. }));
  }
}

#[tokio::test]
async fn leave_still_works_after_session_completes() {
  let s = store().await;
  let session = s.create_session(new_session(3)).await.unwrap();
  let alice = member();

  s.join(session.session_id, alice.clone()).await.unwrap();
  s.set_status(session.session_id, SessionStatus::Completed)
    .await
    .unwrap();

  let outcome = s.leave(session.session_id, alice).await.unwrap();
  assert!(outcome.newly_left);
}

// ─── Capacity edits ──────────────────────────────────────────────────────────

#[tokio::test]
async fn capacity_cannot_drop_below_usage() {
  let s = store().await;
  let session = s.create_session(new_session(5)).await.unwrap();

  for _ in 0..3 {
    s.join(session.session_id, member()).await.unwrap();
  }

  let err = s.set_capacity(session.session_id, 2).await.unwrap_err();
  assert!(matches!(
    err,
    Error::CapacityBelowUsage { capacity: 2, used: 3 }
  ));

  // Exactly the current usage is allowed; the session just becomes full.
  let session = s.set_capacity(session.session_id, 3).await.unwrap();
  assert_eq!(session.capacity, 3);
  let snap = s.snapshot(session.session_id).await.unwrap();
  assert!(snap.is_full());

  let session = s.set_capacity(session.session_id, 10).await.unwrap();
  assert_eq!(session.capacity, 10);
}

#[tokio::test]
async fn capacity_edit_bumps_version() {
  let s = store().await;
  let session = s.create_session(new_session(5)).await.unwrap();

  let updated = s.set_capacity(session.session_id, 6).await.unwrap();
  assert_eq!(updated.version, 1);
}

#[tokio::test]
async fn capacity_edit_on_unknown_session_errors() {
  let s = store().await;

  let err = s.set_capacity(Uuid::new_v4(), 4).await.unwrap_err();
  assert!(matches!(err, Error::SessionNotFound(_)));

  let err = s.set_capacity(Uuid::new_v4(), 0).await.unwrap_err();
  assert!(matches!(err, Error::InvalidCapacity(0)));
}

// ─── Versioning and history ──────────────────────────────────────────────────

#[tokio::test]
async fn version_counts_only_effective_transitions() {
  let s = store().await;
  let session = s.create_session(new_session(3)).await.unwrap();
  let alice = member();

  s.join(session.session_id, alice.clone()).await.unwrap(); // v1
  s.join(session.session_id, alice.clone()).await.unwrap(); // no-op
  s.leave(session.session_id, alice.clone()).await.unwrap(); // v2
  s.leave(session.session_id, alice.clone()).await.unwrap(); // no-op
  s.join(session.session_id, attendee("tok")).await.unwrap(); // v3

  let snap = s.snapshot(session.session_id).await.unwrap();
  assert_eq!(snap.version, 3);
}

#[tokio::test]
async fn history_reconstructs_write_order() {
  let s = store().await;
  let session = s.create_session(new_session(3)).await.unwrap();
  let alice = member();
  let Participant::Member(alice_id) = alice.clone() else {
    unreachable!()
  };

  s.join(session.session_id, alice.clone()).await.unwrap();
  s.join(session.session_id, attendee("tok")).await.unwrap();
  s.leave(session.session_id, alice.clone()).await.unwrap();
  s.join(session.session_id, alice).await.unwrap();
  // No-op: must not appear in the log.
  s.leave(session.session_id, attendee("ghost"))
    .await
    .unwrap();

  let events = s.history(session.session_id).await.unwrap();
  assert_eq!(events.len(), 4);

  let versions: Vec<i64> = events.iter().map(|e| e.version).collect();
  assert_eq!(versions, vec![1, 2, 3, 4]);

  assert_eq!(events[0].actor, alice_id.to_string());
  assert_eq!(events[0].kind, ParticipantKind::Private);
  assert_eq!(events[0].action, TransitionAction::Join);

  assert_eq!(events[1].actor, "tok");
  assert_eq!(events[1].kind, ParticipantKind::Public);

  assert_eq!(events[2].action, TransitionAction::Leave);
  assert_eq!(events[3].action, TransitionAction::Join);
}

#[tokio::test]
async fn active_lists_follow_state_flips() {
  let s = store().await;
  let session = s.create_session(new_session(5)).await.unwrap();
  let alice = member();
  let bob = member();
  let Participant::Member(alice_id) = alice.clone() else {
    unreachable!()
  };
  let Participant::Member(bob_id) = bob.clone() else {
    unreachable!()
  };

  s.join(session.session_id, alice.clone()).await.unwrap();
  s.join(session.session_id, bob).await.unwrap();
  s.join(session.session_id, attendee("tok-a")).await.unwrap();
  s.leave(session.session_id, alice).await.unwrap();

  let members = s.list_active_members(session.session_id).await.unwrap();
  assert_eq!(members, vec![bob_id]);
  assert!(!members.contains(&alice_id));

  let attendees = s.list_active_attendees(session.session_id).await.unwrap();
  assert_eq!(attendees, vec!["tok-a".to_owned()]);
}
