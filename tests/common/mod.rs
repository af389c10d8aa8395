// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

pub mod backend;

use course_session::db::MemoryStore;
use course_session::models::ProfileRow;
use course_session::services::{
    MockIdentity, Notifier, RecordingNotifier, SessionManager, SessionOptions, SessionState,
};
use std::sync::Arc;
use std::time::Duration;

/// Reconciliation delay used by the session tests.
#[allow(dead_code)]
pub const RECONCILE_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound for waiting on asynchronous state changes.
#[allow(dead_code)]
pub const STATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Mounted session manager plus handles on its collaborators.
#[allow(dead_code)]
pub struct Harness {
    pub session: SessionManager<MockIdentity, MemoryStore>,
    pub identity: MockIdentity,
    pub store: MemoryStore,
    pub notifier: Arc<RecordingNotifier>,
}

/// Mount a session manager over the given mock collaborators.
#[allow(dead_code)]
pub async fn mount(identity: MockIdentity, store: MemoryStore) -> Harness {
    let notifier = Arc::new(RecordingNotifier::new());
    let session = SessionManager::mount(
        identity.clone(),
        store.clone(),
        notifier.clone() as Arc<dyn Notifier>,
        SessionOptions {
            reconcile_delay: RECONCILE_DELAY,
        },
    )
    .await;

    Harness {
        session,
        identity,
        store,
        notifier,
    }
}

/// Mount with no session and empty tables.
#[allow(dead_code)]
pub async fn mount_empty() -> Harness {
    mount(MockIdentity::new(), MemoryStore::new()).await
}

/// Build a fully populated profile row.
#[allow(dead_code)]
pub fn profile(id: &str, email: &str, name: &str, points: i64) -> ProfileRow {
    ProfileRow {
        id: id.to_string(),
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        education: None,
        points: Some(points),
    }
}

/// Wait until the session state satisfies `pred`.
#[allow(dead_code)]
pub async fn wait_for_state<I, S>(
    session: &SessionManager<I, S>,
    pred: impl FnMut(&SessionState) -> bool,
) -> SessionState
where
    I: course_session::services::IdentityService,
    S: course_session::db::TableStore,
{
    let mut rx = session.subscribe();
    let state = tokio::time::timeout(STATE_TIMEOUT, rx.wait_for(pred))
        .await
        .expect("Timed out waiting for session state")
        .expect("Session state channel closed")
        .clone();
    state
}

/// Mount with a signed-in user whose profile row holds `points`.
#[allow(dead_code)]
pub async fn mount_signed_in(points: i64) -> Harness {
    let identity = MockIdentity::new();
    let store = MemoryStore::new();
    let user = identity.register_with_id("user-a", "a@b.com", "secret");
    store.seed_profile(profile("user-a", "a@b.com", "A", points));
    identity.set_session(Some(MockIdentity::session_for(&user)));

    let harness = mount(identity, store).await;
    assert_eq!(
        harness.session.user().map(|u| u.points),
        Some(points),
        "Mount should load the profile of the existing session"
    );
    harness
}
