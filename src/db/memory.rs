// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory table store for tests and offline runs.

use crate::db::TableStore;
use crate::error::{FetchError, Result};
use crate::models::{CompletedCourse, NewProfile, ProfileRow};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    profiles: DashMap<String, ProfileRow>,
    completions: DashMap<(String, String), CompletedCourse>,
    requests: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

/// `DashMap`-backed store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile row directly (plays the backend trigger).
    pub fn seed_profile(&self, row: ProfileRow) {
        self.tables.profiles.insert(row.id.clone(), row);
    }

    pub fn profile(&self, id: &str) -> Option<ProfileRow> {
        self.tables.profiles.get(id).map(|r| r.clone())
    }

    pub fn profile_count(&self) -> usize {
        self.tables.profiles.len()
    }

    /// Number of store calls issued so far.
    pub fn request_count(&self) -> usize {
        self.tables.requests.load(Ordering::SeqCst)
    }

    /// Make every read fail with a `FetchError`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.tables.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with a `FetchError`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.tables.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read(&self) -> Result<&Tables> {
        self.tables.requests.fetch_add(1, Ordering::SeqCst);
        if self.tables.fail_reads.load(Ordering::SeqCst) {
            return Err(FetchError::Request("mock read failure".to_string()));
        }
        Ok(&*self.tables)
    }

    fn write(&self) -> Result<&Tables> {
        self.tables.requests.fetch_add(1, Ordering::SeqCst);
        if self.tables.fail_writes.load(Ordering::SeqCst) {
            return Err(FetchError::Request("mock write failure".to_string()));
        }
        Ok(&*self.tables)
    }
}

impl TableStore for MemoryStore {
    async fn fetch_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        Ok(self.read()?.profiles.get(id).map(|r| r.clone()))
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<()> {
        // Same outcome as a primary key violation
        match self.write()?.profiles.entry(profile.id.clone()) {
            Entry::Occupied(_) => Err(FetchError::Status {
                status: 409,
                body: format!("duplicate key: profiles.id = {}", profile.id),
            }),
            Entry::Vacant(slot) => {
                slot.insert(ProfileRow::from(profile.clone()));
                Ok(())
            }
        }
    }

    async fn update_points(&self, id: &str, points: i64) -> Result<()> {
        // PATCH with no matching row is a silent no-op on the wire as well
        if let Some(mut row) = self.write()?.profiles.get_mut(id) {
            row.points = Some(points);
        }
        Ok(())
    }

    async fn has_completed(&self, user_id: &str, course_id: &str) -> Result<bool> {
        Ok(self
            .read()?
            .completions
            .contains_key(&(user_id.to_string(), course_id.to_string())))
    }

    async fn insert_completion(&self, completion: &CompletedCourse) -> Result<()> {
        let key = (completion.user_id.clone(), completion.course_id.clone());
        match self.write()?.completions.entry(key) {
            Entry::Occupied(_) => Err(FetchError::Status {
                status: 409,
                body: "duplicate key: completed_courses".to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(completion.clone());
                Ok(())
            }
        }
    }

    async fn delete_completion(&self, user_id: &str, course_id: &str) -> Result<()> {
        self.write()?
            .completions
            .remove(&(user_id.to_string(), course_id.to_string()));
        Ok(())
    }

    async fn list_completions(&self, user_id: &str) -> Result<Vec<CompletedCourse>> {
        let mut rows: Vec<CompletedCourse> = self
            .read()?
            .completions
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| a.completed_at.cmp(&b.completed_at));
        Ok(rows)
    }
}
