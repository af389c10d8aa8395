// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course completion rows and per-video progress.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Row of the `completed_courses` table, keyed by `(user_id, course_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCourse {
    pub user_id: String,
    pub course_id: String,
    /// RFC 3339 timestamp
    pub completed_at: String,
}

impl CompletedCourse {
    pub fn now(user_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            completed_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Per-video completion tracking for one course.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseProgress {
    total_videos: usize,
    watched: BTreeSet<String>,
}

impl CourseProgress {
    pub fn new(total_videos: usize) -> Self {
        Self {
            total_videos,
            watched: BTreeSet::new(),
        }
    }

    /// Mark a video as watched. Returns false if it was already marked.
    pub fn mark_watched(&mut self, video_id: impl Into<String>) -> bool {
        self.watched.insert(video_id.into())
    }

    pub fn is_watched(&self, video_id: &str) -> bool {
        self.watched.contains(video_id)
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    pub fn total_videos(&self) -> usize {
        self.total_videos
    }

    /// `watched / total`, 0.0 for an empty course and never above 1.0.
    pub fn fraction(&self) -> f64 {
        if self.total_videos == 0 {
            return 0.0;
        }
        (self.watched.len() as f64 / self.total_videos as f64).min(1.0)
    }

    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total_videos > 0 && self.watched.len() >= self.total_videos
    }
}
