// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Table store layer (`profiles`, `completed_courses`).

pub mod memory;
pub mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

use crate::error::Result;
use crate::models::{CompletedCourse, NewProfile, ProfileRow};
use std::future::Future;

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    /// Keyed by `(user_id, course_id)`
    pub const COMPLETED_COURSES: &str = "completed_courses";
}

/// Remote table store with the request/response contract the session
/// manager relies on.
pub trait TableStore: Send + Sync + 'static {
    /// Read the single profile row for `id`, `None` if it does not exist yet.
    fn fetch_profile(&self, id: &str) -> impl Future<Output = Result<Option<ProfileRow>>> + Send;

    fn insert_profile(&self, profile: &NewProfile) -> impl Future<Output = Result<()>> + Send;

    /// Overwrite the point balance of profile `id`.
    fn update_points(&self, id: &str, points: i64) -> impl Future<Output = Result<()>> + Send;

    fn has_completed(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn insert_completion(
        &self,
        completion: &CompletedCourse,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove the `(user_id, course_id)` row. Deleting a missing row is not an error.
    fn delete_completion(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    fn list_completions(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<CompletedCourse>>> + Send;
}
