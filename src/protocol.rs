//! Public protocol structs for HTTP and WebSocket endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{LeaderboardEntry, Level, ProgressRecord, User};

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct RegisterIn {
  pub username: String,
  pub email: String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
  pub username: String,
  pub password: String,
}

/// Public user shape. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserOut {
  pub id: i64,
  pub username: String,
  pub email: String,
  pub level: i64,
  pub score: i64,
}

impl From<User> for UserOut {
  fn from(u: User) -> Self {
    Self { id: u.id, username: u.username, email: u.email, level: u.level, score: u.score }
  }
}

#[derive(Debug, Serialize)]
pub struct AuthOut {
  pub token: String,
  pub user: UserOut,
}

/// Public level shape: the canonical solution is withheld.
#[derive(Debug, Serialize)]
pub struct LevelOut {
  pub id: i64,
  pub language: String,
  #[serde(rename = "levelNumber")]
  pub level_number: i64,
  pub title: String,
  pub description: String,
  pub challenge: String,
  pub points: i64,
  pub hint: Option<String>,
}

impl From<Level> for LevelOut {
  fn from(l: Level) -> Self {
    Self {
      id: l.id,
      language: l.language,
      level_number: l.level_number,
      title: l.title,
      description: l.description,
      challenge: l.challenge,
      points: l.points,
      hint: l.hint,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct SubmitIn {
  pub language: String,
  #[serde(rename = "levelNumber")]
  pub level_number: i64,
  pub solution: String,
}

/// Outcome payload for a submission. `hint` only appears on failure;
/// `points`/`nextLevel` only on success.
#[derive(Debug, Serialize)]
pub struct SubmitOut {
  pub success: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub points: Option<i64>,
  #[serde(rename = "nextLevel", skip_serializing_if = "Option::is_none")]
  pub next_level: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hint: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProgressOut {
  pub language: String,
  pub level: i64,
  pub completed: bool,
  pub score: i64,
  #[serde(rename = "completedAt")]
  pub completed_at: String,
}

impl From<ProgressRecord> for ProgressOut {
  fn from(r: ProgressRecord) -> Self {
    Self {
      language: r.language,
      level: r.level,
      completed: r.completed,
      score: r.score_awarded,
      completed_at: r.completed_at,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct LeaderboardRow {
  pub username: String,
  pub score: i64,
  pub level: i64,
}

impl From<LeaderboardEntry> for LeaderboardRow {
  fn from(e: LeaderboardEntry) -> Self {
    Self { username: e.username, score: e.score, level: e.level }
  }
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
  pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}

//
// WebSocket messages (presence only, no game logic)
//

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
  Ping,
  JoinRoom { room: String },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
  Pong,
  Joined { room: String, online: usize },
  Error { message: String },
}
