//! HTTP endpoint handlers. These are thin wrappers that forward to core
//! logic and the store. Each handler is instrumented; domain rejections
//! become structured payloads, only infrastructure failures become 5xx.

use std::sync::Arc;

use axum::{
  extract::{Path, Query, State},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::domain::SubmissionOutcome;
use crate::error::{ApiError, StoreError};
use crate::logic::submit_solution;
use crate::protocol::*;
use crate::state::AppState;

const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body), fields(username = %body.username))]
pub async fn http_register(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RegisterIn>,
) -> Result<Json<AuthOut>, ApiError> {
  let hash = hash_password(&body.password)?;
  let user = state
    .db
    .create_user(&body.username, &body.email, &hash)
    .map_err(|e| match e {
      StoreError::Duplicate => ApiError::Conflict,
      other => ApiError::Storage(other),
    })?;
  let token = state.jwt.issue(user.id, &user.username)?;
  Ok(Json(AuthOut { token, user: user.into() }))
}

#[instrument(level = "info", skip(state, body), fields(username = %body.username))]
pub async fn http_login(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LoginIn>,
) -> Result<Json<AuthOut>, ApiError> {
  let (user, hash) = state
    .db
    .user_with_hash(&body.username)?
    .ok_or(ApiError::BadCredentials)?;
  if !verify_password(&body.password, &hash)? {
    return Err(ApiError::BadCredentials);
  }
  let token = state.jwt.issue(user.id, &user.username)?;
  info!(target: "codequest_backend", username = %user.username, "Login succeeded");
  Ok(Json(AuthOut { token, user: user.into() }))
}

#[instrument(level = "info", skip(state), fields(user_id = caller.id))]
pub async fn http_profile(
  State(state): State<Arc<AppState>>,
  caller: AuthUser,
) -> Result<Json<UserOut>, ApiError> {
  let user = state
    .db
    .user_by_id(caller.id)?
    .ok_or(ApiError::Unauthorized)?;
  Ok(Json(user.into()))
}

#[instrument(level = "info", skip(state), fields(%language))]
pub async fn http_levels(
  State(state): State<Arc<AppState>>,
  Path(language): Path<String>,
) -> Result<Json<Vec<LevelOut>>, ApiError> {
  let levels = state.db.levels_for_language(&language)?;
  Ok(Json(levels.into_iter().map(LevelOut::from).collect()))
}

#[instrument(level = "info", skip(state, body), fields(user_id = caller.id, language = %body.language, level = body.level_number, submission_len = body.solution.len()))]
pub async fn http_submit(
  State(state): State<Arc<AppState>>,
  caller: AuthUser,
  Json(body): Json<SubmitIn>,
) -> Result<Json<SubmitOut>, ApiError> {
  let outcome = submit_solution(
    &state.db,
    caller.id,
    &body.language,
    body.level_number,
    &body.solution,
  )?;

  let out = match outcome {
    SubmissionOutcome::LevelNotFound => return Err(ApiError::LevelNotFound),
    SubmissionOutcome::EmptySubmission => SubmitOut {
      success: false,
      message: "Submission is empty. Write some code first!".into(),
      points: None,
      next_level: None,
      hint: None,
    },
    SubmissionOutcome::Rejected { message, hint } => SubmitOut {
      success: false,
      message,
      points: None,
      next_level: None,
      hint,
    },
    SubmissionOutcome::Accepted { points, next_level } => SubmitOut {
      success: true,
      message: "Level completed!".into(),
      points: Some(points),
      next_level,
      hint: None,
    },
  };
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(user_id = caller.id))]
pub async fn http_progress(
  State(state): State<Arc<AppState>>,
  caller: AuthUser,
) -> Result<Json<Vec<ProgressOut>>, ApiError> {
  let records = state.db.progress_for_user(caller.id)?;
  Ok(Json(records.into_iter().map(ProgressOut::from).collect()))
}

#[instrument(level = "info", skip(state))]
pub async fn http_leaderboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardRow>>, ApiError> {
  let limit = q
    .limit
    .filter(|n| *n > 0)
    .unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
  let entries = state.db.leaderboard(limit)?;
  Ok(Json(entries.into_iter().map(LeaderboardRow::from).collect()))
}
