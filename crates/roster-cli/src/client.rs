//! Async HTTP client wrapping the roster JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use futures_util::StreamExt as _;
use reqwest::Client;
use roster_core::{
  session::{Session, SessionStatus},
  snapshot::CapacitySnapshot,
  store::{JoinOutcome, LeaveOutcome},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Header the server reads member identity from.
const MEMBER_ID_HEADER: &str = "x-member-id";

/// Active participants of a session, as the server reports them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Participants {
  pub members:      Vec<Uuid>,
  pub public_count: i64,
}

/// Reply to an RSVP; `attendee_token` is what the caller keeps to change
/// their answer later.
#[derive(Debug, Serialize, Deserialize)]
pub struct RsvpReply {
  pub attendee_token: String,
  pub attending:      bool,
  pub changed:        bool,
  pub snapshot:       CapacitySnapshot,
}

/// Async HTTP client for the roster JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

impl ApiClient {
  /// No overall request timeout: the watch stream is long-lived.
  pub fn new(base_url: &str) -> Result<Self> {
    let client = Client::builder()
      .connect_timeout(Duration::from_secs(10))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.base_url)
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  /// `POST /sessions`
  pub async fn create_session(
    &self,
    owner_id: Uuid,
    capacity: i64,
    starts_at: DateTime<Utc>,
  ) -> Result<Session> {
    let resp = self
      .client
      .post(self.url("/sessions"))
      .json(&json!({
        "owner_id":  owner_id,
        "capacity":  capacity,
        "starts_at": starts_at,
      }))
      .send()
      .await
      .context("POST /sessions failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST /sessions → {}", resp.status()));
    }
    resp.json().await.context("deserialising session")
  }

  /// `GET /sessions/{id}`
  pub async fn get_session(&self, session_id: Uuid) -> Result<Session> {
    let resp = self
      .client
      .get(self.url(&format!("/sessions/{session_id}")))
      .send()
      .await
      .context("GET /sessions/{id} failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /sessions/{session_id} → {}", resp.status()));
    }
    resp.json().await.context("deserialising session")
  }

  /// `PATCH /sessions/{id}` with a new status.
  pub async fn set_status(&self, session_id: Uuid, status: SessionStatus) -> Result<Session> {
    self
      .patch_session(session_id, json!({ "status": status }))
      .await
  }

  /// `PATCH /sessions/{id}` with a new capacity.
  pub async fn set_capacity(&self, session_id: Uuid, capacity: i64) -> Result<Session> {
    self
      .patch_session(session_id, json!({ "capacity": capacity }))
      .await
  }

  async fn patch_session(&self, session_id: Uuid, body: serde_json::Value) -> Result<Session> {
    let resp = self
      .client
      .patch(self.url(&format!("/sessions/{session_id}")))
      .json(&body)
      .send()
      .await
      .context("PATCH /sessions/{id} failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("PATCH /sessions/{session_id} → {}", resp.status()));
    }
    resp.json().await.context("deserialising session")
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// `GET /sessions/{id}/snapshot`
  pub async fn snapshot(&self, session_id: Uuid) -> Result<CapacitySnapshot> {
    let resp = self
      .client
      .get(self.url(&format!("/sessions/{session_id}/snapshot")))
      .send()
      .await
      .context("GET /snapshot failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /snapshot → {}", resp.status()));
    }
    resp.json().await.context("deserialising snapshot")
  }

  /// `GET /sessions/{id}/participants`
  pub async fn participants(&self, session_id: Uuid) -> Result<Participants> {
    let resp = self
      .client
      .get(self.url(&format!("/sessions/{session_id}/participants")))
      .send()
      .await
      .context("GET /participants failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /participants → {}", resp.status()));
    }
    resp.json().await.context("deserialising participants")
  }

  // ── Participation ─────────────────────────────────────────────────────────

  /// `POST /sessions/{id}/join`
  pub async fn join(&self, session_id: Uuid, member_id: Uuid) -> Result<JoinOutcome> {
    let resp = self
      .client
      .post(self.url(&format!("/sessions/{session_id}/join")))
      .header(MEMBER_ID_HEADER, member_id.to_string())
      .send()
      .await
      .context("POST /join failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST /join → {}: {}", resp.status(), error_detail(resp).await));
    }
    resp.json().await.context("deserialising join outcome")
  }

  /// `POST /sessions/{id}/leave`
  pub async fn leave(&self, session_id: Uuid, member_id: Uuid) -> Result<LeaveOutcome> {
    let resp = self
      .client
      .post(self.url(&format!("/sessions/{session_id}/leave")))
      .header(MEMBER_ID_HEADER, member_id.to_string())
      .send()
      .await
      .context("POST /leave failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST /leave → {}: {}", resp.status(), error_detail(resp).await));
    }
    resp.json().await.context("deserialising leave outcome")
  }

  /// `POST /sessions/{id}/rsvp`
  pub async fn rsvp(
    &self,
    session_id: Uuid,
    token: Option<&str>,
    contact: Option<&str>,
    attending: bool,
  ) -> Result<RsvpReply> {
    let resp = self
      .client
      .post(self.url(&format!("/sessions/{session_id}/rsvp")))
      .json(&json!({
        "token":     token,
        "contact":   contact,
        "attending": attending,
      }))
      .send()
      .await
      .context("POST /rsvp failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST /rsvp → {}: {}", resp.status(), error_detail(resp).await));
    }
    resp.json().await.context("deserialising rsvp reply")
  }

  // ── Capacity feed ─────────────────────────────────────────────────────────

  /// `GET /sessions/{id}/events` — follow the capacity feed, invoking
  /// `on_snapshot` per event until the server closes the stream.
  pub async fn watch(
    &self,
    session_id: Uuid,
    mut on_snapshot: impl FnMut(&CapacitySnapshot),
  ) -> Result<()> {
    let resp = self
      .client
      .get(self.url(&format!("/sessions/{session_id}/events")))
      .send()
      .await
      .context("GET /events failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /events → {}", resp.status()));
    }

    let mut stream = resp.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
      let chunk = chunk.context("reading event stream")?;
      buffer.push_str(std::str::from_utf8(&chunk).context("event stream is not UTF-8")?);

      // Frames are separated by a blank line.
      while let Some(boundary) = buffer.find("\n\n") {
        let frame: String = buffer.drain(..boundary + 2).collect();
        if let Some(snapshot) = parse_frame(&frame)? {
          on_snapshot(&snapshot);
        }
      }
    }

    Ok(())
  }
}

/// Extract the JSON payload of a feed frame. Keep-alive comments carry no
/// data and yield `None`.
fn parse_frame(frame: &str) -> Result<Option<CapacitySnapshot>> {
  let mut data = String::new();
  for line in frame.lines() {
    if let Some(rest) = line.strip_prefix("data:") {
      data.push_str(rest.trim_start());
    }
  }
  if data.is_empty() {
    return Ok(None);
  }
  let snapshot = serde_json::from_str(&data).context("deserialising snapshot frame")?;
  Ok(Some(snapshot))
}

/// Pull the `message` out of an error body, or fall back to the raw text.
async fn error_detail(resp: reqwest::Response) -> String {
  let raw = resp.text().await.unwrap_or_default();
  match serde_json::from_str::<serde_json::Value>(&raw) {
    Ok(body) => body
      .get("message")
      .and_then(|m| m.as_str())
      .map(str::to_string)
      .unwrap_or(raw),
    Err(_) => raw,
  }
}
