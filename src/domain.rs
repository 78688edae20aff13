//! Domain models used by the backend: users, levels, progress records, and
//! the outcome of a submission.

use serde::{Deserialize, Serialize};

/// A registered player. `score` and `level` are cached projections over the
/// progress table; `score` is monotonically non-decreasing and must always
/// equal the sum of `score_awarded` across the user's completed levels.
#[derive(Clone, Debug, Serialize)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub email: String,
  /// Highest level reached (1-based, per language-agnostic convenience cache).
  pub level: i64,
  /// Cached cumulative score, maintained by the completion transaction.
  pub score: i64,
}

/// An immutable challenge definition, identified by (language, level_number).
/// Levels for a language form a strictly increasing sequence starting at 1.
#[derive(Clone, Debug, Serialize)]
pub struct Level {
  pub id: i64,
  pub language: String,
  pub level_number: i64,
  pub title: String,
  pub description: String,
  pub challenge: String,
  /// Reference text checked against submissions via normalized substring
  /// containment. Never exposed through the public API.
  pub solution: String,
  pub hint: Option<String>,
  pub points: i64,
}

/// A level definition as it arrives from built-in seeds or the TOML bank,
/// before it has a row id. Validated at seeding time (non-blank solution,
/// positive points and level number).
#[derive(Clone, Debug, Deserialize)]
pub struct LevelSeed {
  pub language: String,
  pub level_number: i64,
  pub title: String,
  pub description: String,
  pub challenge: String,
  pub solution: String,
  #[serde(default)]
  pub hint: Option<String>,
  pub points: i64,
}

/// One row per (user, language, level). Created or overwritten only by a
/// successful submission; failed attempts leave no trace.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressRecord {
  pub user_id: i64,
  pub language: String,
  pub level: i64,
  pub completed: bool,
  /// The level's point value frozen at completion time.
  pub score_awarded: i64,
  pub completed_at: String,
}

/// One leaderboard row: users ranked by cached score descending, ties broken
/// by ascending user id (registration order).
#[derive(Clone, Debug, Serialize)]
pub struct LeaderboardEntry {
  pub username: String,
  pub score: i64,
  pub level: i64,
}

/// What the submission orchestrator decided. Domain rejections are values,
/// not errors; only storage failures surface as `Err` from the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
  /// Blank after trimming; checked before the evaluator runs. No mutation.
  EmptySubmission,
  /// No level exists at (language, level_number). No mutation.
  LevelNotFound,
  /// Wrong answer. The hint is surfaced only here. No mutation.
  Rejected { message: String, hint: Option<String> },
  /// Correct answer: ledger upserted, score conditionally credited.
  /// `next_level` is None when the language's sequence is complete.
  Accepted { points: i64, next_level: Option<i64> },
}
