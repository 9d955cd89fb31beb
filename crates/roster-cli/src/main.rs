//! `roster` — command-line client for the roster participation server.
//!
//! # Usage
//!
//! ```
//! roster create --owner 4fd1…03aa --capacity 8 --starts-at 2026-09-01T18:00:00Z
//! roster join 2b15…e333 --member 4fd1…03aa
//! roster rsvp 2b15…e333 --contact alice@example.com
//! roster watch 2b15…e333
//! ```
//!
//! The server URL comes from `--url` or `ROSTER_URL`; the member identity
//! for join/leave from `--member` or `ROSTER_MEMBER_ID`.

mod client;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use client::ApiClient;
use roster_core::session::SessionStatus;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "roster", about = "Client for the roster participation server")]
struct Args {
  /// Base URL of the roster server.
  #[arg(long, env = "ROSTER_URL", default_value = "http://localhost:8080")]
  url: String,

  /// Member id sent as the identity header on join/leave.
  #[arg(long, env = "ROSTER_MEMBER_ID")]
  member: Option<Uuid>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create a session.
  Create {
    #[arg(long)]
    owner:     Uuid,
    #[arg(long)]
    capacity:  i64,
    /// RFC 3339, e.g. 2026-09-01T18:00:00Z.
    #[arg(long)]
    starts_at: DateTime<Utc>,
  },
  /// Print a session row.
  Show { session_id: Uuid },
  /// Print the capacity snapshot.
  Snapshot { session_id: Uuid },
  /// Print active member ids and the public count.
  Participants { session_id: Uuid },
  /// Join as the configured member.
  Join { session_id: Uuid },
  /// Leave as the configured member.
  Leave { session_id: Uuid },
  /// Public RSVP by saved token or contact detail.
  Rsvp {
    session_id: Uuid,
    #[arg(long, conflicts_with = "contact")]
    token:      Option<String>,
    #[arg(long)]
    contact:    Option<String>,
    /// Withdraw the RSVP instead of confirming it.
    #[arg(long)]
    cancel:     bool,
  },
  /// Change session capacity.
  SetCapacity { session_id: Uuid, capacity: i64 },
  /// Change session status.
  SetStatus {
    session_id: Uuid,
    #[arg(value_parser = parse_status)]
    status:     SessionStatus,
  },
  /// Follow the live capacity feed, one line per change.
  Watch { session_id: Uuid },
}

fn parse_status(s: &str) -> Result<SessionStatus, String> {
  SessionStatus::parse_str(s)
    .ok_or_else(|| "expected one of: scheduled, in_progress, completed, cancelled".to_string())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let client = ApiClient::new(&args.url)?;

  match args.command {
    Command::Create {
      owner,
      capacity,
      starts_at,
    } => {
      let session = client.create_session(owner, capacity, starts_at).await?;
      print_json(&session)
    }
    Command::Show { session_id } => print_json(&client.get_session(session_id).await?),
    Command::Snapshot { session_id } => print_json(&client.snapshot(session_id).await?),
    Command::Participants { session_id } => print_json(&client.participants(session_id).await?),
    Command::Join { session_id } => {
      let member = require_member(&args.member)?;
      print_json(&client.join(session_id, member).await?)
    }
    Command::Leave { session_id } => {
      let member = require_member(&args.member)?;
      print_json(&client.leave(session_id, member).await?)
    }
    Command::Rsvp {
      session_id,
      token,
      contact,
      cancel,
    } => {
      if token.is_none() && contact.is_none() {
        bail!("provide --token or --contact");
      }
      let reply = client
        .rsvp(session_id, token.as_deref(), contact.as_deref(), !cancel)
        .await?;
      print_json(&reply)
    }
    Command::SetCapacity {
      session_id,
      capacity,
    } => print_json(&client.set_capacity(session_id, capacity).await?),
    Command::SetStatus { session_id, status } => {
      print_json(&client.set_status(session_id, status).await?)
    }
    Command::Watch { session_id } => {
      client
        .watch(session_id, |snapshot| {
          println!(
            "v{:<4} used {}/{}  available {}",
            snapshot.version, snapshot.used, snapshot.capacity, snapshot.available
          );
        })
        .await
    }
  }
}

fn require_member(member: &Option<Uuid>) -> Result<Uuid> {
  member
    .as_ref()
    .copied()
    .context("set --member or ROSTER_MEMBER_ID")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
