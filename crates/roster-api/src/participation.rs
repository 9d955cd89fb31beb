//! Handlers for participation transitions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/sessions/:id/join` | Requires `x-member-id`; idempotent |
//! | `POST` | `/sessions/:id/leave` | Requires `x-member-id`; idempotent |
//! | `POST` | `/sessions/:id/rsvp` | Anonymous; body carries token or contact |
//!
//! Member endpoints and the anonymous RSVP endpoint converge on the same
//! service calls; only the participant identity differs.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use roster_core::{
  participant::Participant,
  snapshot::CapacitySnapshot,
  store::{JoinOutcome, LeaveOutcome, SessionStore},
};
use roster_service::ParticipationService;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, identity::MemberIdentity, token::derive_attendee_token};

// ─── Member join / leave ──────────────────────────────────────────────────────

/// `POST /sessions/:id/join`
pub async fn join<S>(
  State(service): State<Arc<ParticipationService<S>>>,
  Path(id): Path<Uuid>,
  MemberIdentity(member_id): MemberIdentity,
) -> Result<Json<JoinOutcome>, ApiError>
where
  S: SessionStore,
{
  let outcome = service
    .request_join(id, Participant::Member(member_id))
    .await?;
  Ok(Json(outcome))
}

/// `POST /sessions/:id/leave`
pub async fn leave<S>(
  State(service): State<Arc<ParticipationService<S>>>,
  Path(id): Path<Uuid>,
  MemberIdentity(member_id): MemberIdentity,
) -> Result<Json<LeaveOutcome>, ApiError>
where
  S: SessionStore,
{
  let outcome = service
    .request_leave(id, Participant::Member(member_id))
    .await?;
  Ok(Json(outcome))
}

// ─── Anonymous RSVP ───────────────────────────────────────────────────────────

/// Either a previously issued token, or the contact detail to derive one
/// from. `attending: false` cancels.
#[derive(Debug, Deserialize)]
pub struct RsvpBody {
  #[serde(default)]
  pub token:     Option<String>,
  #[serde(default)]
  pub contact:   Option<String>,
  pub attending: bool,
}

/// Echoes the token so the caller can store it for later changes.
#[derive(Debug, Serialize)]
pub struct RsvpResponse {
  pub attendee_token: String,
  pub attending:      bool,
  pub changed:        bool,
  pub snapshot:       CapacitySnapshot,
}

fn resolve_token(body: &RsvpBody) -> Result<String, ApiError> {
  if let Some(token) = &body.token {
    let token = token.trim();
    if token.is_empty() {
      return Err(ApiError::BadRequest("token must not be empty".to_owned()));
    }
    return Ok(token.to_owned());
  }

  match &body.contact {
    Some(contact) if !contact.trim().is_empty() => Ok(derive_attendee_token(contact)),
    _ => Err(ApiError::BadRequest(
      "provide either a token or a contact".to_owned(),
    )),
  }
}

/// `POST /sessions/:id/rsvp`
pub async fn rsvp<S>(
  State(service): State<Arc<ParticipationService<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RsvpBody>,
) -> Result<Json<RsvpResponse>, ApiError>
where
  S: SessionStore,
{
  let token = resolve_token(&body)?;
  let participant = Participant::Attendee(token.clone());

  let (changed, snapshot) = if body.attending {
    let outcome = service.request_join(id, participant).await?;
    (outcome.newly_joined, outcome.snapshot)
  } else {
    let outcome = service.request_leave(id, participant).await?;
    (outcome.newly_left, outcome.snapshot)
  };

  Ok(Json(RsvpResponse {
    attendee_token: token,
    attending: body.attending,
    changed,
    snapshot,
  }))
}
