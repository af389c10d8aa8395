// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity service session and change-notification types.
//!
//! Sessions are opaque to the session manager: it only looks at the
//! subject id and whether a session is present at all.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Credential bundle issued by the identity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds as reported at issue time
    #[serde(default)]
    pub expires_in: i64,
    /// Absolute expiry (Unix timestamp)
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: IdentityUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Subject identifier (the `profiles.id` of this user).
    pub fn subject_id(&self) -> &str {
        &self.user.id
    }

    /// Fill in `expires_at` from `expires_in` when the service omitted it.
    pub fn with_absolute_expiry(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(Utc::now().timestamp() + self.expires_in);
        }
        self
    }

    /// True when the access token expires within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now().timestamp() + margin.num_seconds() >= expires_at,
            None => false,
        }
    }
}

/// User object embedded in sessions and signup responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

/// Auxiliary registration data attached to a signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
}

/// Result of an accepted registration.
///
/// `session` is only present when the service signs the user in
/// immediately (no email confirmation).
#[derive(Debug, Clone, PartialEq)]
pub struct SignupResponse {
    pub user: Option<IdentityUser>,
    pub session: Option<Session>,
}

/// Session state transition kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// One change notification as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl AuthChange {
    pub fn new(event: AuthEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }

    pub fn signed_out() -> Self {
        Self::new(AuthEvent::SignedOut, None)
    }
}
