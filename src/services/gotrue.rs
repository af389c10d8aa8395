// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for a Supabase-style auth API (`/auth/v1`).
//!
//! Handles:
//! - Password sign in and registration
//! - Sign out
//! - Access token refresh when close to expiry
//! - Change-notification fan-out to subscribers

use crate::config::Config;
use crate::error::AuthError;
use crate::models::{AuthChange, AuthEvent, IdentityUser, Session, SignupMetadata, SignupResponse};
use crate::services::identity::{
    AuthSubscription, IdentityService, SharedSession, SubscriptionId, Subscribers,
};
use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Margin before token expiration when we proactively refresh (1 minute).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Identity service client. Clones share the session and subscribers.
#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: SharedSession,
    subscribers: Arc<Subscribers>,
    /// Serializes refresh so one expiring session is refreshed once.
    refresh_lock: Arc<Mutex<()>>,
}

impl GoTrueClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/auth/v1", config.supabase_url),
            anon_key: config.supabase_anon_key.clone(),
            session: Arc::new(RwLock::new(None)),
            subscribers: Arc::new(Subscribers::default()),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Session slot shared with the table store.
    pub fn session_handle(&self) -> SharedSession {
        self.session.clone()
    }

    /// Seed the in-memory session, e.g. with one handed over at startup.
    pub async fn set_session(&self, session: Session) {
        *self.session.write().await = Some(session.with_absolute_expiry());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// POST a JSON body to an auth endpoint and parse the JSON reply.
    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
        bearer: Option<&str>,
    ) -> Result<T, AuthError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .query(query)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(self.anon_key.as_str()))
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AuthError::Network(format!("JSON parse error: {}", e)))
    }

    /// Exchange a refresh token for a new session.
    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let session: Session = self
            .post_json(
                "/token",
                &[("grant_type", "refresh_token")],
                &serde_json::json!({ "refresh_token": refresh_token }),
                None,
            )
            .await?;
        Ok(session.with_absolute_expiry())
    }

    async fn store_signed_in(&self, session: Session) {
        *self.session.write().await = Some(session.clone());
        self.subscribers
            .emit(AuthChange::new(AuthEvent::SignedIn, Some(session)));
    }
}

impl IdentityService for GoTrueClient {
    /// Return the cached session, refreshing it first if it expires soon.
    ///
    /// A rejected refresh token ends the session (`SIGNED_OUT`); a network
    /// failure keeps it and is returned to the caller.
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        match self.session.read().await.as_ref() {
            None => return Ok(None),
            Some(s) if !s.expires_within(margin) => return Ok(Some(s.clone())),
            Some(_) => {}
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we were waiting.
        let current = self.session.read().await.clone();
        let session = match current {
            None => return Ok(None),
            Some(s) if !s.expires_within(margin) => return Ok(Some(s)),
            Some(s) => s,
        };

        tracing::info!(user_id = %session.subject_id(), "Access token expiring, refreshing");

        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                *self.session.write().await = Some(refreshed.clone());
                self.subscribers.emit(AuthChange::new(
                    AuthEvent::TokenRefreshed,
                    Some(refreshed.clone()),
                ));
                Ok(Some(refreshed))
            }
            Err(AuthError::Network(e)) => Err(AuthError::Network(e)),
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh rejected, signing out");
                *self.session.write().await = None;
                self.subscribers.emit(AuthChange::signed_out());
                Ok(None)
            }
        }
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.subscribers.subscribe()
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session: Session = self
            .post_json(
                "/token",
                &[("grant_type", "password")],
                &serde_json::json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        let session = session.with_absolute_expiry();

        tracing::info!(user_id = %session.subject_id(), "Signed in");
        self.store_signed_in(session.clone()).await;
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignupMetadata,
    ) -> Result<SignupResponse, AuthError> {
        let body: serde_json::Value = self
            .post_json(
                "/signup",
                &[],
                &serde_json::json!({ "email": email, "password": password, "data": metadata }),
                None,
            )
            .await?;

        // Autoconfirm projects answer with a full session, others with the user.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)
                .map_err(|e| AuthError::Network(format!("JSON parse error: {}", e)))?;
            let session = session.with_absolute_expiry();
            let user = session.user.clone();
            self.store_signed_in(session.clone()).await;
            return Ok(SignupResponse {
                user: Some(user),
                session: Some(session),
            });
        }

        let user_value = body
            .get("user")
            .filter(|user| user.is_object())
            .cloned()
            .unwrap_or(body);
        let user: Option<IdentityUser> = serde_json::from_value(user_value).ok();

        tracing::info!(user_id = ?user.as_ref().map(|u| u.id.as_str()), "Registration accepted");
        Ok(SignupResponse {
            user,
            session: None,
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.session.write().await.take();
        self.subscribers.emit(AuthChange::signed_out());

        let Some(session) = session else {
            return Ok(());
        };

        let response = self
            .http
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        // An already invalid token means the server side session is gone too
        match response.status().as_u16() {
            401 | 404 => Ok(()),
            _ => check_response(response).await.map(|_| ()),
        }
    }
}

/// Check response status and map backend error bodies to `AuthError`.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(parse_error_body(status, &body))
}

/// Map an auth API error body to `AuthError::Service`.
///
/// Newer servers send `{ code, error_code, msg }`, older ones
/// `{ error, error_description }`.
pub fn parse_error_body(status: u16, body: &str) -> AuthError {
    let value: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let field = |name: &str| value.get(name).and_then(|v| v.as_str()).map(str::to_string);

    let message = field("msg")
        .or_else(|| field("message"))
        .or_else(|| field("error_description"))
        .or_else(|| field("error"))
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                body.to_string()
            }
        });

    let mut code = field("error_code");
    if code.is_none() && message.eq_ignore_ascii_case("invalid login credentials") {
        code = Some(AuthError::INVALID_CREDENTIALS.to_string());
    }

    AuthError::Service {
        status: Some(status),
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_body_new_format() {
        let err = parse_error_body(
            400,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert!(err.is_invalid_credentials());
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn test_parse_error_body_legacy_format() {
        let err = parse_error_body(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert!(err.is_invalid_credentials());
    }

    #[test]
    fn test_parse_error_body_plain_text() {
        let err = parse_error_body(502, "Bad Gateway");
        assert_eq!(
            err,
            AuthError::Service {
                status: Some(502),
                code: None,
                message: "Bad Gateway".to_string(),
            }
        );

        let err = parse_error_body(500, "");
        assert_eq!(err.to_string(), "HTTP 500");
    }
}
