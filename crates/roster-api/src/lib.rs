//! JSON REST API for Roster.
//!
//! Exposes an axum [`Router`] over a [`ParticipationService`] backed by any
//! [`roster_core::store::SessionStore`]. Member identity arrives as a header
//! the upstream proxy is trusted to set; TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", roster_api::api_router(service.clone()))
//! ```

pub mod error;
pub mod feed;
pub mod identity;
pub mod participation;
pub mod sessions;
pub mod token;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use roster_core::store::SessionStore;
use roster_service::ParticipationService;
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `roster.toml` with
/// `ROSTER_*` environment overrides. Every field has a default so the server
/// runs without a config file.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  /// Joins stay open this many minutes past `starts_at`.
  #[serde(default = "default_join_grace_minutes")]
  pub join_grace_minutes: i64,
  /// Broadcast buffer per session; lagging feed readers skip to newest.
  #[serde(default = "default_channel_capacity")]
  pub channel_capacity:   usize,
}

fn default_host() -> String {
  "127.0.0.1".to_string()
}
fn default_port() -> u16 {
  8080
}
fn default_store_path() -> PathBuf {
  PathBuf::from("roster.db")
}
fn default_join_grace_minutes() -> i64 {
  15
}
fn default_channel_capacity() -> usize {
  roster_service::notifier::DEFAULT_CHANNEL_CAPACITY
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: Arc<ParticipationService<S>>) -> Router<()>
where
  S: SessionStore + 'static,
{
  Router::new()
    .route("/healthz", get(healthz))
    // Sessions
    .route("/sessions", post(sessions::create::<S>))
    .route(
      "/sessions/{id}",
      get(sessions::get_one::<S>).patch(sessions::update::<S>),
    )
    .route("/sessions/{id}/snapshot", get(sessions::snapshot::<S>))
    .route("/sessions/{id}/participants", get(sessions::participants::<S>))
    // Participation
    .route("/sessions/{id}/join", post(participation::join::<S>))
    .route("/sessions/{id}/leave", post(participation::leave::<S>))
    .route("/sessions/{id}/rsvp", post(participation::rsvp::<S>))
    // Capacity feed
    .route("/sessions/{id}/events", get(feed::events::<S>))
    .with_state(service)
}

async fn healthz() -> &'static str {
  "ok"
}

// ─── Integration tests ────────────────────────────────────────────────────────
