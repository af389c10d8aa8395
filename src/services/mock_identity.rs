// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory identity service for tests and offline runs.

use crate::error::AuthError;
use crate::models::{AuthChange, AuthEvent, IdentityUser, Session, SignupMetadata, SignupResponse};
use crate::services::identity::{AuthSubscription, IdentityService, SubscriptionId, Subscribers};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Account {
    password: String,
    user: IdentityUser,
}

struct MockState {
    accounts: DashMap<String, Account>,
    session: Mutex<Option<Session>>,
    subscribers: Subscribers,
    next_user: AtomicU64,
    /// When set, every service call fails with this error
    failure: Mutex<Option<AuthError>>,
    emit_events: AtomicBool,
    sign_out_calls: AtomicUsize,
    session_delay: Mutex<Option<Duration>>,
}

/// Programmable identity service. Clones share accounts and subscribers.
#[derive(Clone)]
pub struct MockIdentity {
    state: Arc<MockState>,
}

impl Default for MockIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdentity {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                accounts: DashMap::new(),
                session: Mutex::new(None),
                subscribers: Subscribers::default(),
                next_user: AtomicU64::new(1),
                failure: Mutex::new(None),
                emit_events: AtomicBool::new(true),
                sign_out_calls: AtomicUsize::new(0),
                session_delay: Mutex::new(None),
            }),
        }
    }

    /// Register an account with an explicit subject id.
    pub fn register_with_id(&self, id: &str, email: &str, password: &str) -> IdentityUser {
        let user = IdentityUser {
            id: id.to_string(),
            email: Some(email.to_string()),
            user_metadata: serde_json::Value::Null,
        };
        self.state.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Register an account with a generated subject id.
    pub fn register(&self, email: &str, password: &str) -> IdentityUser {
        let id = self.next_id();
        self.register_with_id(&id, email, password)
    }

    /// Subject id registered for `email`.
    pub fn user_id(&self, email: &str) -> Option<String> {
        self.state.accounts.get(email).map(|a| a.user.id.clone())
    }

    /// Replace the current session without emitting anything.
    pub fn set_session(&self, session: Option<Session>) {
        if let Ok(mut guard) = self.state.session.lock() {
            *guard = session;
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.state.session.lock().ok().and_then(|s| s.clone())
    }

    /// Make every subsequent call fail with `error` (`None` restores service).
    pub fn fail_with(&self, error: Option<AuthError>) {
        if let Ok(mut guard) = self.state.failure.lock() {
            *guard = error;
        }
    }

    /// Make `get_session` take `delay` before answering.
    pub fn set_session_delay(&self, delay: Option<Duration>) {
        if let Ok(mut guard) = self.state.session_delay.lock() {
            *guard = delay;
        }
    }

    /// Toggle the automatic `SIGNED_IN`/`SIGNED_OUT` notifications.
    pub fn set_emit_events(&self, emit: bool) {
        self.state.emit_events.store(emit, Ordering::SeqCst);
    }

    /// Deliver a change notification to every subscriber.
    pub fn emit(&self, change: AuthChange) {
        self.state.subscribers.emit(change);
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.subscribers.len()
    }

    pub fn sign_out_calls(&self) -> usize {
        self.state.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Issue a one hour session for `user`.
    pub fn session_for(user: &IdentityUser) -> Session {
        Session {
            access_token: format!("mock-access-{}", user.id),
            refresh_token: format!("mock-refresh-{}", user.id),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: None,
            user: user.clone(),
        }
        .with_absolute_expiry()
    }

    fn next_id(&self) -> String {
        format!("user-{}", self.state.next_user.fetch_add(1, Ordering::SeqCst))
    }

    fn check_failure(&self) -> Result<(), AuthError> {
        match self.state.failure.lock().ok().and_then(|f| f.clone()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn emit_if_enabled(&self, change: AuthChange) {
        if self.state.emit_events.load(Ordering::SeqCst) {
            self.state.subscribers.emit(change);
        }
    }
}

impl IdentityService for MockIdentity {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let delay = self.state.session_delay.lock().ok().and_then(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure()?;
        Ok(self.current_session())
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.state.subscribers.subscribe()
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.subscribers.unsubscribe(id)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.check_failure()?;

        let user = match self.state.accounts.get(email) {
            Some(account) if account.password == password => account.user.clone(),
            _ => {
                return Err(AuthError::Service {
                    status: Some(400),
                    code: Some(AuthError::INVALID_CREDENTIALS.to_string()),
                    message: "Invalid login credentials".to_string(),
                })
            }
        };

        let session = Self::session_for(&user);
        self.set_session(Some(session.clone()));
        self.emit_if_enabled(AuthChange::new(AuthEvent::SignedIn, Some(session.clone())));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignupMetadata,
    ) -> Result<SignupResponse, AuthError> {
        self.check_failure()?;

        if self.state.accounts.contains_key(email) {
            return Err(AuthError::Service {
                status: Some(422),
                code: Some("user_already_exists".to_string()),
                message: "User already registered".to_string(),
            });
        }

        let mut user = self.register(email, password);
        user.user_metadata = serde_json::to_value(metadata).unwrap_or_default();
        if let Some(mut account) = self.state.accounts.get_mut(email) {
            account.user = user.clone();
        }

        Ok(SignupResponse {
            user: Some(user),
            session: None,
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.state.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        self.set_session(None);
        self.emit_if_enabled(AuthChange::signed_out());
        Ok(())
    }
}
