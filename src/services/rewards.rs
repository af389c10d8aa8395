// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course completion recording and the points award it gates.

use crate::db::TableStore;
use crate::error::FetchError;
use crate::models::CompletedCourse;
use crate::services::identity::IdentityService;
use crate::services::session::SessionManager;

/// Result of [`CourseRewards::complete_course`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    NotSignedIn,
    /// The completion row already existed; no points were awarded.
    AlreadyCompleted,
    /// First completion; `points` is the new balance.
    Awarded { points: i64 },
}

/// Awards points once per `(user, course)` pair.
pub struct CourseRewards<I: IdentityService, S: TableStore> {
    session: SessionManager<I, S>,
}

impl<I: IdentityService, S: TableStore> Clone for CourseRewards<I, S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

impl<I: IdentityService, S: TableStore> CourseRewards<I, S> {
    pub fn new(session: SessionManager<I, S>) -> Self {
        Self { session }
    }

    /// Record that the signed-in user finished `course_id` and award
    /// `reward` points if this is the first completion.
    ///
    /// If the award does not go through the completion row is deleted
    /// again, so a later call can retry.
    pub async fn complete_course(
        &self,
        course_id: &str,
        reward: i64,
    ) -> Result<CompletionOutcome, FetchError> {
        let Some(user) = self.session.user() else {
            return Ok(CompletionOutcome::NotSignedIn);
        };
        let store = self.session.store();

        if store.has_completed(&user.id, course_id).await? {
            tracing::debug!(user_id = %user.id, course_id, "Course already completed");
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        match store
            .insert_completion(&CompletedCourse::now(&user.id, course_id))
            .await
        {
            Ok(()) => {}
            // Lost a race against another completion of the same course
            Err(FetchError::Status { status: 409, .. }) => {
                return Ok(CompletionOutcome::AlreadyCompleted)
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, course_id, error = %e, "Failed to record completion");
                return Err(e);
            }
        }

        let outcome = match self.session.update_user_points(reward).await {
            Ok(Some(points)) => CompletionOutcome::Awarded { points },
            Ok(None) => {
                self.rollback(&user.id, course_id).await;
                CompletionOutcome::NotSignedIn
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, course_id, error = %e, "Points award failed");
                self.rollback(&user.id, course_id).await;
                return Err(e);
            }
        };

        tracing::info!(user_id = %user.id, course_id, reward, ?outcome, "Course completed");
        Ok(outcome)
    }

    async fn rollback(&self, user_id: &str, course_id: &str) {
        if let Err(e) = self
            .session
            .store()
            .delete_completion(user_id, course_id)
            .await
        {
            tracing::error!(user_id, course_id, error = %e, "Failed to remove unrewarded completion");
        }
    }

    /// Completions of the signed-in user, oldest first. Empty when signed out.
    pub async fn completed_courses(&self) -> Result<Vec<CompletedCourse>, FetchError> {
        match self.session.user() {
            Some(user) => self.session.store().list_completions(&user.id).await,
            None => Ok(Vec::new()),
        }
    }
}
