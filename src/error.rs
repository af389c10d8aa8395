// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the identity service and the table store.
//!
//! `AuthError` is surfaced to the user (toast) and returned to the caller.
//! `FetchError` is only logged; callers see stale or empty state.

/// Identity service failure (credentials, validation or transport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("{message}")]
    Service {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AuthError {
    /// Error code reported by the backend for bad email/password pairs.
    pub const INVALID_CREDENTIALS: &'static str = "invalid_credentials";

    pub fn service(status: Option<u16>, message: impl Into<String>) -> Self {
        AuthError::Service {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Check whether this error means the email/password pair was rejected.
    pub fn is_invalid_credentials(&self) -> bool {
        match self {
            AuthError::Service { code, message, .. } => {
                code.as_deref() == Some(Self::INVALID_CREDENTIALS)
                    || message.to_lowercase().contains("invalid login credentials")
            }
            _ => false,
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort_unstable();
        AuthError::InvalidInput(format!("invalid {}", fields.join(", ")))
    }
}

/// Table store failure (profile or completion read/write).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    /// Rejected locally, nothing was sent.
    #[error("Points overflow: {points} + {delta}")]
    PointsOverflow { points: i64, delta: i64 },
}

/// Result type alias for table store operations
pub type Result<T> = std::result::Result<T, FetchError>;
