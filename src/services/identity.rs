// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity service contract and change-notification fan-out.

use crate::error::AuthError;
use crate::models::{AuthChange, Session, SignupMetadata, SignupResponse};
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// In-memory session slot shared between the identity client and the
/// table store (which needs the access token). Never persisted.
pub type SharedSession = Arc<RwLock<Option<Session>>>;

/// Handle identifying one change-notification registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A live change-notification registration.
///
/// Events arrive in emission order. The owner must hand `id` back to
/// [`IdentityService::unsubscribe`] exactly once.
#[derive(Debug)]
pub struct AuthSubscription {
    pub id: SubscriptionId,
    pub events: mpsc::UnboundedReceiver<AuthChange>,
}

/// Backend identity service.
pub trait IdentityService: Send + Sync + 'static {
    /// Current session, `None` when signed out.
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, AuthError>> + Send;

    /// Register for session state transitions.
    fn on_auth_state_change(&self) -> AuthSubscription;

    /// Release a registration. Returns false if it was already released.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, AuthError>> + Send;

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignupMetadata,
    ) -> impl Future<Output = Result<SignupResponse, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;
}

/// Subscriber registry used by identity service implementations.
#[derive(Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    senders: DashMap<SubscriptionId, mpsc::UnboundedSender<AuthChange>>,
}

impl Subscribers {
    pub fn subscribe(&self) -> AuthSubscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, events) = mpsc::unbounded_channel();
        self.senders.insert(id, tx);
        AuthSubscription { id, events }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.senders.remove(&id).is_some()
    }

    /// Deliver `change` to every subscriber, dropping closed ones.
    pub fn emit(&self, change: AuthChange) {
        tracing::debug!(event = ?change.event, subscribers = self.senders.len(), "Auth state change");
        self.senders.retain(|_, tx| tx.send(change.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
