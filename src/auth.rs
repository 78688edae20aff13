//! Authentication: Argon2 password hashing, HS256 JWT issue/verify, and the
//! extractor that turns a Bearer token into a verified user identity.
//!
//! Tokens carry the user id and username; expiry defaults to 24 hours. In
//! production JWT_SECRET must be set; without it a dev-only secret is used
//! and a warning is logged at startup.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use axum::{async_trait, extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Hash a password using Argon2id. Returns the PHC-formatted hash string
/// that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Auth(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored PHC hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
  let parsed = PasswordHash::new(hash)
    .map_err(|e| ApiError::Auth(format!("Invalid password hash format: {e}")))?;
  Ok(Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok())
}

/// Payload stored in the JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  /// User id.
  pub sub: i64,
  pub username: String,
  pub iat: u64,
  pub exp: u64,
}

/// Signing/verification keys derived from JWT_SECRET.
#[derive(Clone)]
pub struct JwtKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
}

impl JwtKeys {
  pub fn new(secret: &str) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
    }
  }

  /// Build keys from JWT_SECRET, falling back to a dev-only secret.
  pub fn from_env() -> Self {
    match std::env::var("JWT_SECRET") {
      Ok(secret) if !secret.is_empty() => Self::new(&secret),
      _ => {
        warn!(target: "codequest_backend", "JWT_SECRET not set; using dev-only secret");
        Self::new("dev-mode-secret-not-for-production-use-123456")
      }
    }
  }

  pub fn issue(&self, user_id: i64, username: &str) -> Result<String, ApiError> {
    let now = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map_err(|e| ApiError::Auth(format!("System time error: {e}")))?
      .as_secs();
    let claims = Claims {
      sub: user_id,
      username: username.to_string(),
      iat: now,
      exp: now + TOKEN_TTL_SECS,
    };
    encode(&Header::default(), &claims, &self.encoding)
      .map_err(|e| ApiError::Auth(format!("Failed to sign token: {e}")))
  }

  /// Decode and validate a token (signature + expiry). Any failure is an
  /// `Unauthorized`, not a server error.
  pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(token, &self.decoding, &Validation::default())
      .map(|data| data.claims)
      .map_err(|_| ApiError::Unauthorized)
  }
}

/// Verified caller identity, extracted from the Authorization header.
/// Handlers that take an `AuthUser` reject unauthenticated requests before
/// any game logic runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
  pub id: i64,
  pub username: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &Arc<AppState>,
  ) -> Result<Self, Self::Rejection> {
    let header = parts
      .headers
      .get(AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .ok_or(ApiError::Unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;
    let claims = state.jwt.verify(token)?;
    Ok(AuthUser { id: claims.sub, username: claims.username })
  }
}
