//! Application state: the SQLite store, JWT keys, and the presence counter.
//!
//! Startup seeds the level catalog idempotently: built-in levels first, then
//! any extra levels from the optional TOML bank. The catalog is read-only
//! afterwards; all mutable game state lives in the database.

use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;

use tracing::{info, instrument};

use crate::auth::JwtKeys;
use crate::config::load_game_config_from_env;
use crate::error::StoreError;
use crate::seeds::seed_levels;
use crate::store::Db;

pub struct AppState {
  pub db: Db,
  pub jwt: JwtKeys,
  /// Connected WebSocket clients, for the presence channel only.
  pub online: AtomicUsize,
}

impl AppState {
  /// Build state from env: open the database, seed levels, load JWT keys.
  #[instrument(level = "info", skip_all)]
  pub fn from_env() -> Result<Self, StoreError> {
    let path: PathBuf = std::env::var("DATABASE_PATH")
      .unwrap_or_else(|_| "./data/codequest.db".into())
      .into();
    let db = Db::open(&path)?;
    info!(target: "codequest_backend", path = %path.display(), "SQLite store opened");

    let state = Self::with_db(db);
    state.seed()?;
    Ok(state)
  }

  /// Wrap an already-open database (used by tests with in-memory stores).
  pub fn with_db(db: Db) -> Self {
    Self {
      db,
      jwt: JwtKeys::from_env(),
      online: AtomicUsize::new(0),
    }
  }

  /// Idempotent catalog seeding: built-in levels plus the optional TOML bank.
  pub fn seed(&self) -> Result<(), StoreError> {
    let built_in = self.db.seed_levels(&seed_levels())?;
    let mut extra = 0;
    if let Some(cfg) = load_game_config_from_env() {
      extra = self.db.seed_levels(&cfg.levels)?;
    }
    info!(target: "game", built_in, extra, "Level catalog ready");
    Ok(())
  }
}
