// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session manager: owns the signed-in user view model.
//!
//! The manager mirrors the remote `profiles` row of the session subject
//! into local state, reacts to identity change notifications, and exposes
//! the account lifecycle actions (login, signup, logout, points update).
//!
//! State is published through a `watch` channel so consumers re-render on
//! every change. One listener task consumes change notifications in order;
//! a later event always overwrites the effect of an earlier one.

use crate::config::DEFAULT_RECONCILE_DELAY_MS;
use crate::db::TableStore;
use crate::error::{AuthError, FetchError};
use crate::models::{AuthChange, AuthEvent, NewProfile, SignupMetadata, User};
use crate::services::identity::{AuthSubscription, IdentityService, SubscriptionId};
use crate::services::notifier::{Notifier, Toast};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use validator::Validate;

/// Render-facing session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    /// True until the mount-time session check resolves and while a
    /// login or signup call is in flight.
    pub is_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Wait before checking that the backend created the signup profile row
    pub reconcile_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            reconcile_delay: Duration::from_millis(DEFAULT_RECONCILE_DELAY_MS),
        }
    }
}

/// Registration form data.
#[derive(Debug, Clone, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub education: Option<String>,
}

/// State channel plus the liveness flag that gates every write.
struct StateCell {
    tx: watch::Sender<SessionState>,
    active: AtomicBool,
}

impl StateCell {
    /// Apply `f` unless the manager was torn down. Returns whether it applied.
    fn apply(&self, f: impl FnOnce(&mut SessionState)) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        self.tx.send_modify(f);
        true
    }

    fn loading(&self) -> LoadingGuard<'_> {
        self.apply(|s| s.is_loading = true);
        LoadingGuard { cell: self }
    }
}

/// Clears `is_loading` when dropped, including on cancellation.
struct LoadingGuard<'a> {
    cell: &'a StateCell,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.cell.apply(|s| s.is_loading = false);
    }
}

struct Listener {
    id: SubscriptionId,
    task: JoinHandle<()>,
}

struct Shared<I: IdentityService, S: TableStore> {
    identity: I,
    store: S,
    notifier: Arc<dyn Notifier>,
    cell: StateCell,
    options: SessionOptions,
    initialized: AtomicBool,
    listener: std::sync::Mutex<Option<Listener>>,
    /// Per-user mutex to serialize point updates. Entries are dropped
    /// once no update for that user is running or waiting.
    point_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<I: IdentityService, S: TableStore> Shared<I, S> {
    /// Stop applying state and release the change subscription, once.
    fn release(&self) {
        self.cell.active.store(false, Ordering::SeqCst);

        let listener = self.listener.lock().ok().and_then(|mut l| l.take());
        if let Some(listener) = listener {
            listener.task.abort();
            self.identity.unsubscribe(listener.id);
            tracing::debug!("Session listener released");
        }
    }
}

impl<I: IdentityService, S: TableStore> Drop for Shared<I, S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle to the session context. Clones share one state.
///
/// Construct once at the application root with [`SessionManager::mount`]
/// and call [`SessionManager::teardown`] on shutdown. Dropping the last
/// handle releases the subscription as well.
pub struct SessionManager<I: IdentityService, S: TableStore> {
    shared: Arc<Shared<I, S>>,
}

impl<I: IdentityService, S: TableStore> Clone for SessionManager<I, S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<I: IdentityService, S: TableStore> SessionManager<I, S> {
    /// [`SessionManager::new`] followed by [`SessionManager::init`].
    pub async fn mount(
        identity: I,
        store: S,
        notifier: Arc<dyn Notifier>,
        options: SessionOptions,
    ) -> Self {
        let manager = Self::new(identity, store, notifier, options);
        manager.init().await;
        manager
    }

    /// Build an uninitialized manager. State starts out loading with no user.
    pub fn new(identity: I, store: S, notifier: Arc<dyn Notifier>, options: SessionOptions) -> Self {
        let (tx, _) = watch::channel(SessionState::default());
        Self {
            shared: Arc::new(Shared {
                identity,
                store,
                notifier,
                cell: StateCell {
                    tx,
                    active: AtomicBool::new(true),
                },
                options,
                initialized: AtomicBool::new(false),
                listener: std::sync::Mutex::new(None),
                point_locks: DashMap::new(),
            }),
        }
    }

    /// Run the initialization protocol and start listening for changes.
    /// Only the first call does anything.
    ///
    /// Never fails: an unreadable session leaves the user signed out.
    pub async fn init(&self) {
        if self.shared.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let _loading = self.shared.cell.loading();
            match self.shared.identity.get_session().await {
                Ok(Some(session)) => self.fetch_profile(session.subject_id()).await,
                Ok(None) => tracing::debug!("No session at mount"),
                Err(e) => tracing::warn!(error = %e, "Failed to read current session"),
            }
        }

        self.start_listener();
    }

    fn start_listener(&self) {
        let AuthSubscription { id, mut events } = self.shared.identity.on_auth_state_change();
        let weak: Weak<Shared<I, S>> = Arc::downgrade(&self.shared);

        let task = tokio::spawn(async move {
            while let Some(change) = events.recv().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                SessionManager { shared }.handle_auth_change(change).await;
            }
        });

        let Ok(mut listener) = self.shared.listener.lock() else {
            task.abort();
            self.shared.identity.unsubscribe(id);
            return;
        };
        // Torn down while the initial check was running
        if !self.is_active() {
            task.abort();
            self.shared.identity.unsubscribe(id);
            return;
        }
        *listener = Some(Listener { id, task });
    }

    /// Stop the listener and unsubscribe. Idempotent.
    ///
    /// Requests still in flight complete, but their results are discarded.
    pub fn teardown(&self) {
        self.shared.release();
    }

    pub fn is_active(&self) -> bool {
        self.shared.cell.active.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SessionState {
        self.shared.cell.tx.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.shared.cell.tx.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.cell.tx.borrow().is_loading
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.cell.tx.subscribe()
    }

    pub fn identity(&self) -> &I {
        &self.shared.identity
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    fn notify(&self, toast: Toast) {
        self.shared.notifier.notify(toast);
    }

    /// Mirror the profile row of `subject_id` into `user`.
    ///
    /// Failures are logged and leave `user` untouched, as does a missing row.
    pub async fn fetch_profile(&self, subject_id: &str) {
        match self.shared.store.fetch_profile(subject_id).await {
            Ok(Some(row)) => {
                let user = User::from(row);
                tracing::debug!(user_id = %user.id, points = user.points, "Profile loaded");
                self.shared.cell.apply(|s| s.user = Some(user));
            }
            Ok(None) => {
                tracing::debug!(user_id = %subject_id, "No profile row yet");
            }
            Err(e) => {
                tracing::error!(user_id = %subject_id, error = %e, "Failed to fetch profile");
            }
        }
    }

    /// Change-notification handler.
    pub async fn handle_auth_change(&self, change: AuthChange) {
        match (change.event, change.session) {
            (AuthEvent::SignedIn | AuthEvent::TokenRefreshed, Some(session)) => {
                self.fetch_profile(session.subject_id()).await;
            }
            (AuthEvent::SignedOut, _) => {
                self.shared.cell.apply(|s| s.user = None);
            }
            (event, _) => {
                tracing::debug!(?event, "Ignoring auth event");
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// Does not populate `user` itself: the `SIGNED_IN` notification does,
    /// possibly after this returns.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let _loading = self.shared.cell.loading();

        match self
            .shared
            .identity
            .sign_in_with_password(email, password)
            .await
        {
            Ok(session) => {
                tracing::info!(user_id = %session.subject_id(), "Login succeeded");
                self.notify(Toast::success(
                    "Welcome back!",
                    "You have successfully logged in.",
                ));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                self.notify(Toast::failure("Login failed", e.to_string()));
                Err(e)
            }
        }
    }

    /// Register a new account.
    ///
    /// On acceptance a reconciliation task runs after the configured delay:
    /// it inserts a zero-point profile row if the backend has not created
    /// one yet, then loads the profile.
    pub async fn signup(&self, request: &SignupRequest) -> Result<(), AuthError> {
        let _loading = self.shared.cell.loading();

        let result = match request.validate() {
            Ok(()) => {
                let metadata = SignupMetadata {
                    name: request.name.clone(),
                    education: request.education.clone(),
                };
                self.shared
                    .identity
                    .sign_up(&request.email, &request.password, &metadata)
                    .await
            }
            Err(e) => Err(AuthError::from(e)),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Signup failed");
                self.notify(Toast::failure("Signup failed", e.to_string()));
                return Err(e);
            }
        };

        match response.user {
            Some(user) => {
                tracing::info!(user_id = %user.id, "Signup accepted");
                self.schedule_reconciliation(NewProfile {
                    id: user.id,
                    name: request.name.clone(),
                    email: user.email.unwrap_or_else(|| request.email.clone()),
                    education: request.education.clone(),
                    points: 0,
                });
            }
            None => {
                tracing::warn!("Signup accepted without a user, skipping profile reconciliation");
            }
        }

        self.notify(Toast::success(
            "Account created!",
            "Welcome! Your account has been created.",
        ));
        Ok(())
    }

    fn schedule_reconciliation(&self, draft: NewProfile) {
        let weak = Arc::downgrade(&self.shared);
        let delay = self.shared.options.reconcile_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                SessionManager { shared }.reconcile_profile(draft).await;
            }
        });
    }

    async fn reconcile_profile(&self, draft: NewProfile) {
        if !self.is_active() {
            return;
        }

        match self.shared.store.fetch_profile(&draft.id).await {
            Ok(Some(_)) => {
                tracing::debug!(user_id = %draft.id, "Profile row created by backend");
            }
            Ok(None) => {
                tracing::info!(user_id = %draft.id, "Profile row missing after signup, inserting");
                if let Err(e) = self.shared.store.insert_profile(&draft).await {
                    tracing::error!(user_id = %draft.id, error = %e, "Failed to insert profile");
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %draft.id, error = %e, "Failed to check profile row");
            }
        }

        self.fetch_profile(&draft.id).await;
    }

    /// Sign out. Local state is cleared whatever the service answers.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.shared.cell.apply(|s| s.user = None);

        let result = self.shared.identity.sign_out().await;

        // A profile fetch in flight may have landed meanwhile
        self.shared.cell.apply(|s| s.user = None);

        match result {
            Ok(()) => {
                tracing::info!("Logout succeeded");
                self.notify(Toast::success(
                    "Logged out",
                    "You have been successfully logged out.",
                ));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Logout failed");
                self.notify(Toast::failure("Logout failed", e.to_string()));
                Err(e)
            }
        }
    }

    /// Add `delta` to the signed-in user's points and persist the balance.
    ///
    /// Returns the new balance, or `None` when nobody is signed in (no
    /// request is issued then). Updates for one user are serialized, so
    /// overlapping calls never lose a delta. On failure local points are
    /// left unchanged.
    pub async fn update_user_points(&self, delta: i64) -> Result<Option<i64>, FetchError> {
        let Some(user_id) = self.user().map(|u| u.id) else {
            return Ok(None);
        };

        let lock = self
            .shared
            .point_locks
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.apply_points(&user_id, delta).await
        };

        // Only the map and `lock` hold it: nobody else is waiting.
        self.shared
            .point_locks
            .remove_if(&user_id, |_, l| Arc::strong_count(l) <= 2);

        result
    }

    async fn apply_points(&self, user_id: &str, delta: i64) -> Result<Option<i64>, FetchError> {
        // Re-read under the lock: an earlier update may have landed.
        let Some(user) = self.user().filter(|u| u.id == user_id) else {
            return Ok(None);
        };
        let Some(new_points) = user.points.checked_add(delta) else {
            tracing::error!(user_id = %user.id, points = user.points, delta, "Points overflow");
            return Err(FetchError::PointsOverflow {
                points: user.points,
                delta,
            });
        };

        if let Err(e) = self.shared.store.update_points(&user.id, new_points).await {
            tracing::error!(user_id = %user.id, delta, error = %e, "Failed to update points");
            return Err(e);
        }

        self.shared.cell.apply(|s| {
            if let Some(u) = s.user.as_mut().filter(|u| u.id == user_id) {
                u.points = new_points;
            }
        });

        tracing::info!(user_id = %user_id, delta, points = new_points, "Points updated");
        Ok(Some(new_points))
    }
}
