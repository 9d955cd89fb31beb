//! SQLite backend for the roster session store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Participation writes run inside
//! `BEGIN IMMEDIATE` transactions; SQLite's single-writer lock is what makes
//! the capacity check and the slot write atomic.

mod encode;
mod ops;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
