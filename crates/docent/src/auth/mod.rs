//! User identity for request handlers
//!
//! Token issuance and validation live in the fronting auth gateway; by the
//! time a request reaches Docent the gateway has resolved the caller and
//! installed a stable user id in the `x-user-id` header. Handlers consume
//! that id through a validating extractor, which doubles as the safety
//! boundary for everything derived from it (upload paths, index filters).

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};
use thiserror::Error;

/// Header installed by the auth gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// Maximum length for user IDs
const MAX_USER_ID_LEN: usize = 128;

/// Errors that can occur during user ID validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UserIdError {
    /// User ID is empty
    #[error("User ID cannot be empty")]
    Empty,

    /// User ID contains invalid characters
    #[error("User ID contains invalid characters: allowed are a-z, A-Z, 0-9, _, -")]
    InvalidChars,

    /// User ID exceeds maximum length
    #[error("User ID exceeds maximum length of {MAX_USER_ID_LEN} characters")]
    TooLong,
}

/// A validated user ID
///
/// User IDs must:
/// - Be non-empty
/// - Contain only alphanumeric characters, underscores, and hyphens
/// - Be at most 128 characters long
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Get the user ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), UserIdError> {
        if s.is_empty() {
            return Err(UserIdError::Empty);
        }

        if s.len() > MAX_USER_ID_LEN {
            return Err(UserIdError::TooLong);
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(UserIdError::InvalidChars);
        }

        Ok(())
    }
}

impl TryFrom<&str> for UserId {
    type Error = UserIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::validate(value)?;
        Ok(UserId(value.to_string()))
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::validate(&value)?;
        Ok(UserId(value))
    }
}

impl From<UserId> for String {
    fn from(user_id: UserId) -> Self {
        user_id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("missing user identity"))?;

        UserId::try_from(value).map_err(|e| unauthorized(&e.to_string()))
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": {
                "type": "unauthorized",
                "message": message,
            }
        })),
    )
}
