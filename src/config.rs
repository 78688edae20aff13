//! Loading game configuration (optional extra level bank) from TOML.
//!
//! See `GameConfig` for the expected schema. Each `[[levels]]` entry uses the
//! same fields as the built-in seeds; invalid entries are skipped with a log
//! line at seeding time rather than aborting startup.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::LevelSeed;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GameConfig {
  #[serde(default)]
  pub levels: Vec<LevelSeed>,
}

/// Attempt to load `GameConfig` from GAME_CONFIG_PATH. On any parsing/IO
/// error, returns None.
pub fn load_game_config_from_env() -> Option<GameConfig> {
  let path = std::env::var("GAME_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<GameConfig>(&s) {
      Ok(cfg) => {
        info!(target: "codequest_backend", %path, extra_levels = cfg.levels.len(), "Loaded game config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "codequest_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "codequest_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
