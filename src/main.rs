//! Code Quest · Coding Game Backend
//!
//! - Axum HTTP + WebSocket API
//! - SQLite persistence for users, levels, and per-level progress
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT          : u16 (default 5000)
//!   DATABASE_PATH    : SQLite file path (default "./data/codequest.db")
//!   JWT_SECRET    : token signing secret (dev default used if absent)
//!   GAME_CONFIG_PATH  : path to TOML config (optional extra level bank)
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod domain;
mod config;
mod seeds;
mod error;
mod store;
mod auth;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (SQLite store, seeded levels, JWT keys).
  let state = Arc::new(AppState::from_env()?);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 5000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 5000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "codequest_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
