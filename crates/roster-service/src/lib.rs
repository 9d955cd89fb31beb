//! Participation service for the roster tracker.
//!
//! Composes a [`roster_core::store::SessionStore`] backend with the
//! join-window policy owned by the scheduling layer and a best-effort change
//! notifier. The HTTP and CLI layers call this crate, never a store directly,
//! so every entry point applies the same gate and emits the same
//! notifications.

pub mod gate;
pub mod notifier;
pub mod service;

pub use gate::{CutoffGate, JoinGate, OpenGate};
pub use notifier::ChangeNotifier;
pub use service::ParticipationService;

#[cfg(test)]
mod tests;
