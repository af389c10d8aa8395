// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Points updates against the profile row.

use course_session::db::{MemoryStore, TableStore};
use course_session::error::{FetchError, Result};
use course_session::models::{CompletedCourse, NewProfile, ProfileRow};
use course_session::services::{MockIdentity, Notifier, RecordingNotifier, SessionManager, SessionOptions};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{mount_empty, mount_signed_in, profile};

#[tokio::test]
async fn test_points_noop_when_signed_out() {
    let h = mount_empty().await;

    let result = h.session.update_user_points(50).await;

    assert_eq!(result, Ok(None));
    assert_eq!(h.store.request_count(), 0, "No request without a user");
    assert!(h.session.user().is_none());
}

#[tokio::test]
async fn test_points_success_adds_delta() {
    let h = mount_signed_in(10).await;

    let result = h.session.update_user_points(15).await;

    assert_eq!(result, Ok(Some(25)));
    assert_eq!(h.session.user().map(|u| u.points), Some(25));
    assert_eq!(h.store.profile("user-a").and_then(|r| r.points), Some(25));
}

#[tokio::test]
async fn test_points_negative_delta() {
    let h = mount_signed_in(10).await;

    assert_eq!(h.session.update_user_points(-4).await, Ok(Some(6)));
}

#[tokio::test]
async fn test_points_failure_leaves_local_points() {
    let h = mount_signed_in(10).await;
    h.store.set_fail_writes(true);

    let result = h.session.update_user_points(15).await;

    assert!(result.is_err());
    assert_eq!(h.session.user().map(|u| u.points), Some(10));
    assert_eq!(h.store.profile("user-a").and_then(|r| r.points), Some(10));
    assert!(h.notifier.toasts().is_empty(), "Fetch errors are never toasted");
}

#[tokio::test]
async fn test_points_overflow_is_rejected_locally() {
    let h = mount_signed_in(10).await;
    let requests_before = h.store.request_count();

    let result = h.session.update_user_points(i64::MAX).await;

    assert_eq!(
        result,
        Err(FetchError::PointsOverflow {
            points: 10,
            delta: i64::MAX
        })
    );
    assert_eq!(h.store.request_count(), requests_before, "Nothing sent");
    assert_eq!(h.session.user().map(|u| u.points), Some(10));
    assert_eq!(h.store.profile("user-a").and_then(|r| r.points), Some(10));
}

#[tokio::test]
async fn test_points_underflow_is_rejected_locally() {
    let h = mount_signed_in(-10).await;

    let result = h.session.update_user_points(i64::MIN).await;

    assert!(matches!(result, Err(FetchError::PointsOverflow { .. })));
    assert_eq!(h.session.user().map(|u| u.points), Some(-10));
}

#[tokio::test]
async fn test_sequential_point_updates() {
    let h = mount_signed_in(0).await;

    h.session.update_user_points(50).await.expect("first");
    h.session.update_user_points(50).await.expect("second");

    assert_eq!(h.session.user().map(|u| u.points), Some(100));
    assert_eq!(h.store.profile("user-a").and_then(|r| r.points), Some(100));
}

/// Store whose point writes take a while, so updates overlap.
#[derive(Clone)]
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl TableStore for SlowStore {
    async fn fetch_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.inner.fetch_profile(id).await
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<()> {
        self.inner.insert_profile(profile).await
    }

    async fn update_points(&self, id: &str, points: i64) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.update_points(id, points).await
    }

    async fn has_completed(&self, user_id: &str, course_id: &str) -> Result<bool> {
        self.inner.has_completed(user_id, course_id).await
    }

    async fn insert_completion(&self, completion: &CompletedCourse) -> Result<()> {
        self.inner.insert_completion(completion).await
    }

    async fn delete_completion(&self, user_id: &str, course_id: &str) -> Result<()> {
        self.inner.delete_completion(user_id, course_id).await
    }

    async fn list_completions(&self, user_id: &str) -> Result<Vec<CompletedCourse>> {
        self.inner.list_completions(user_id).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_point_updates_are_serialized() {
    let identity = MockIdentity::new();
    let memory = MemoryStore::new();
    let user = identity.register_with_id("user-a", "a@b.com", "secret");
    identity.set_session(Some(MockIdentity::session_for(&user)));
    memory.seed_profile(profile("user-a", "a@b.com", "A", 0));

    let session = SessionManager::mount(
        identity,
        SlowStore {
            inner: memory.clone(),
            delay: Duration::from_millis(200),
        },
        Arc::new(RecordingNotifier::new()) as Arc<dyn Notifier>,
        SessionOptions::default(),
    )
    .await;

    let (first, second) = tokio::join!(
        session.update_user_points(50),
        session.update_user_points(50)
    );

    let mut balances = vec![first.unwrap().unwrap(), second.unwrap().unwrap()];
    balances.sort_unstable();
    assert_eq!(balances, vec![50, 100]);
    assert_eq!(session.user().map(|u| u.points), Some(100));
    assert_eq!(memory.profile("user-a").and_then(|r| r.points), Some(100));
}
