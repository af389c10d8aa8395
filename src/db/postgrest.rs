// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgREST client for the `profiles` and `completed_courses` tables.
//!
//! Requests carry the anon key as `apikey` and the signed-in user's
//! access token as bearer auth so row level security applies.

use crate::config::Config;
use crate::db::{tables, TableStore};
use crate::error::{FetchError, Result};
use crate::models::{CompletedCourse, NewProfile, ProfileRow};
use crate::services::identity::SharedSession;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Table store backed by the project's `/rest/v1` endpoint.
#[derive(Clone)]
pub struct PostgrestStore {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: SharedSession,
}

impl PostgrestStore {
    pub fn new(config: &Config, session: SharedSession) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/rest/v1", config.supabase_url),
            anon_key: config.supabase_anon_key.clone(),
            session,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    /// Attach `apikey` and the best available bearer token.
    async fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());
        request.header("apikey", &self.anon_key).bearer_auth(token)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let request = self
            .http
            .get(self.table_url(table))
            .query(&[("select", "*")])
            .query(filters);

        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn insert<T: Serialize>(&self, table: &str, row: &T) -> Result<()> {
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(row);

        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        check_response(response).await?;
        Ok(())
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Status { status, body })
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

impl TableStore for PostgrestStore {
    async fn fetch_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        let rows: Vec<ProfileRow> = self.select(tables::PROFILES, &[("id", eq(id))]).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<()> {
        self.insert(tables::PROFILES, profile).await
    }

    async fn update_points(&self, id: &str, points: i64) -> Result<()> {
        let request = self
            .http
            .patch(self.table_url(tables::PROFILES))
            .query(&[("id", eq(id))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "points": points }));

        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        check_response(response).await?;
        Ok(())
    }

    async fn has_completed(&self, user_id: &str, course_id: &str) -> Result<bool> {
        let rows: Vec<CompletedCourse> = self
            .select(
                tables::COMPLETED_COURSES,
                &[("user_id", eq(user_id)), ("course_id", eq(course_id))],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn insert_completion(&self, completion: &CompletedCourse) -> Result<()> {
        self.insert(tables::COMPLETED_COURSES, completion).await
    }

    async fn delete_completion(&self, user_id: &str, course_id: &str) -> Result<()> {
        let request = self
            .http
            .delete(self.table_url(tables::COMPLETED_COURSES))
            .query(&[("user_id", eq(user_id)), ("course_id", eq(course_id))])
            .header("Prefer", "return=minimal");

        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        check_response(response).await?;
        Ok(())
    }

    async fn list_completions(&self, user_id: &str) -> Result<Vec<CompletedCourse>> {
        let request = self
            .http
            .get(self.table_url(tables::COMPLETED_COURSES))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", eq(user_id)),
                ("order", "completed_at.asc".to_string()),
            ]);

        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}
