//! Handler for the `/sessions/:id/events` capacity feed.
//!
//! Server-sent events: the current snapshot first, then one `capacity`
//! event per snapshot-changing write. Subscription happens before the
//! initial read so no change can fall between the two.

use std::{convert::Infallible, sync::Arc};

use axum::{
  extract::{Path, State},
  response::sse::{Event, KeepAlive, Sse},
};
use futures_util::Stream;
use roster_core::store::SessionStore;
use roster_service::ParticipationService;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /sessions/:id/events`
pub async fn events<S>(
  State(service): State<Arc<ParticipationService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
  S: SessionStore,
{
  // Refuse unknown sessions before subscribing, so probing a bad id cannot
  // park a channel in the notifier.
  service
    .get_session(id)
    .await?
    .ok_or(roster_core::Error::SessionNotFound(id))?;

  let mut rx = service.subscribe(id);
  let initial = service.snapshot(id).await?;

  let stream = async_stream::stream! {
    if let Ok(event) = Event::default().event("capacity").json_data(&initial) {
      yield Ok(event);
    }

    loop {
      match rx.recv().await {
        Ok(snapshot) => {
          if let Ok(event) = Event::default().event("capacity").json_data(&snapshot) {
            yield Ok(event);
          }
        }
        // A slow reader only cares about the newest state; skip ahead.
        Err(RecvError::Lagged(_)) => continue,
        Err(RecvError::Closed) => break,
      }
    }
  };

  Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
