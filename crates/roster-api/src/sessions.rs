//! Handlers for `/sessions` boundary and read endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/sessions` | Body: `{"owner_id":…,"capacity":…,"starts_at":…}` |
//! | `GET`   | `/sessions/:id` | 404 if not found |
//! | `PATCH` | `/sessions/:id` | Body: `{"capacity":…}` and/or `{"status":…}` |
//! | `GET`   | `/sessions/:id/snapshot` | Derived counts, never cached |
//! | `GET`   | `/sessions/:id/participants` | Member ids + anonymous count |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use roster_core::{
  Error,
  session::{NewSession, Session, SessionStatus},
  snapshot::CapacitySnapshot,
  store::SessionStore,
};
use roster_service::ParticipationService;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub owner_id:  Uuid,
  pub capacity:  i64,
  pub starts_at: DateTime<Utc>,
}

/// `POST /sessions`
pub async fn create<S>(
  State(service): State<Arc<ParticipationService<S>>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SessionStore,
{
  let session = service
    .create_session(NewSession {
      owner_id:  body.owner_id,
      capacity:  body.capacity,
      starts_at: body.starts_at,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(session)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /sessions/:id`
pub async fn get_one<S>(
  State(service): State<Arc<ParticipationService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError>
where
  S: SessionStore,
{
  let session = service
    .get_session(id)
    .await?
    .ok_or(Error::SessionNotFound(id))?;
  Ok(Json(session))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub capacity: Option<i64>,
  pub status:   Option<SessionStatus>,
}

/// `PATCH /sessions/:id` — status first, then capacity, so one request can
/// close a session and resize it together.
pub async fn update<S>(
  State(service): State<Arc<ParticipationService<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Session>, ApiError>
where
  S: SessionStore,
{
  let mut session = None;
  if let Some(status) = body.status {
    session = Some(service.set_status(id, status).await?);
  }
  if let Some(capacity) = body.capacity {
    session = Some(service.set_capacity(id, capacity).await?);
  }

  match session {
    Some(session) => Ok(Json(session)),
    None => Err(ApiError::BadRequest(
      "nothing to update: provide capacity and/or status".to_owned(),
    )),
  }
}

// ─── Snapshot ─────────────────────────────────────────────────────────────────

/// `GET /sessions/:id/snapshot`
pub async fn snapshot<S>(
  State(service): State<Arc<ParticipationService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CapacitySnapshot>, ApiError>
where
  S: SessionStore,
{
  Ok(Json(service.snapshot(id).await?))
}

// ─── Participants ─────────────────────────────────────────────────────────────

/// Active participants as a display roster. Attendee tokens are deliberately
/// not exposed; anonymous attendance is reported only as a count.
#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
  pub members:      Vec<Uuid>,
  pub public_count: i64,
}

/// `GET /sessions/:id/participants`
pub async fn participants<S>(
  State(service): State<Arc<ParticipationService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ParticipantsResponse>, ApiError>
where
  S: SessionStore,
{
  // 404 for unknown sessions rather than an empty roster.
  service
    .get_session(id)
    .await?
    .ok_or(Error::SessionNotFound(id))?;

  let members = service.list_active_members(id).await?;
  let attendees = service.list_active_attendees(id).await?;

  Ok(Json(ParticipantsResponse {
    members,
    public_count: attendees.len() as i64,
  }))
}
