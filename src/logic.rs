//! Core game behaviors shared by the HTTP handlers.
//!
//! This includes:
//!   - The solution evaluator (normalized substring containment)
//!   - The submission orchestrator: catalog lookup, evaluation, and the
//!     transactional progress/score update on success
//!   - Next-level sequencing

use tracing::{info, instrument};

use crate::domain::SubmissionOutcome;
use crate::error::StoreError;
use crate::store::Db;

/// Decide pass/fail for a submission against a level's canonical solution.
///
/// Both sides are trimmed and lowercased; the submission passes when the
/// normalized solution appears as a substring of the normalized submission.
/// Deliberately permissive: surrounding markup, comments, or extra code
/// don't matter as long as the key snippet is present. Pure and
/// deterministic, no side effects.
pub fn solution_matches(submitted: &str, canonical: &str) -> bool {
  let submitted = submitted.trim().to_lowercase();
  let canonical = canonical.trim().to_lowercase();
  submitted.contains(&canonical)
}

/// Run one submission end to end.
///
/// Empty submissions and catalog misses are handled before the evaluator.
/// A wrong answer returns `Rejected` (with the level's hint) and mutates
/// nothing. A correct answer records completion and credits the score as a
/// single transactional unit, then resolves the next level: `Some(n + 1)`
/// when such a level exists for the language, `None` when the sequence is
/// complete. Only storage failures surface as `Err`; retrying a submission
/// is always safe because the ledger write is idempotent.
#[instrument(level = "info", skip(db, submitted), fields(%language, submission_len = submitted.len()))]
pub fn submit_solution(
  db: &Db,
  user_id: i64,
  language: &str,
  level_number: i64,
  submitted: &str,
) -> Result<SubmissionOutcome, StoreError> {
  if submitted.trim().is_empty() {
    return Ok(SubmissionOutcome::EmptySubmission);
  }

  let Some(level) = db.level(language, level_number)? else {
    return Ok(SubmissionOutcome::LevelNotFound);
  };

  if !solution_matches(submitted, &level.solution) {
    info!(target: "game", user_id, %language, level = level_number, "Submission rejected");
    return Ok(SubmissionOutcome::Rejected {
      message: "Try again!".into(),
      hint: level.hint,
    });
  }

  let previous = db.record_completion(user_id, language, level_number, level.points)?;
  let next_level = db
    .level(language, level_number + 1)?
    .map(|l| l.level_number);

  info!(
    target: "game",
    user_id,
    %language,
    level = level_number,
    points = level.points,
    first_completion = !previous.previously_completed,
    next_level = ?next_level,
    "Submission accepted"
  );
  Ok(SubmissionOutcome::Accepted { points: level.points, next_level })
}
