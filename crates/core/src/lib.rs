//! Shared primitives for all Rust crates in Clavis.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Clavis crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Error categories surfaced by the access-control engine.
#[derive(Debug, Error)]
pub enum AppError {
    /// Referenced role does not exist or is disabled.
    #[error("role not found: {0}")]
    RoleNotFound(String),

    /// Referenced permission does not exist or is disabled.
    #[error("permission not found: {0}")]
    PermissionNotFound(String),

    /// A hierarchy edge would create a cycle.
    #[error("cycle detected: {0}")]
    CycleDetected(String),

    /// A role is already at its active-assignment cap.
    #[error("assignment limit exceeded: role '{role}' allows at most {max_users} active assignments")]
    AssignmentLimitExceeded {
        /// Role name at its cap.
        role: String,
        /// Configured cap.
        max_users: u32,
    },

    /// A permission references an unsupported scope value.
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// The entity store failed or is unreachable.
    #[error("storage unavailable: {0}")]
    Storage(String),
}
