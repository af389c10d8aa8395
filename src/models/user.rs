// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User view model and the `profiles` rows it mirrors.

use serde::{Deserialize, Serialize};

/// Signed-in user as seen by the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity subject id (also the `profiles` primary key)
    pub id: String,
    pub email: String,
    pub name: String,
    pub education: Option<String>,
    /// Reward balance, mirrors `profiles.points`
    pub points: i64,
}

impl From<ProfileRow> for User {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email.unwrap_or_default(),
            name: row.name.unwrap_or_default(),
            education: row.education,
            points: row.points.unwrap_or(0),
        }
    }
}

/// Row of the `profiles` table. Every column but `id` is nullable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub points: Option<i64>,
}

/// Insert payload for the client-side fallback profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    pub points: i64,
}

impl From<NewProfile> for ProfileRow {
    fn from(p: NewProfile) -> Self {
        Self {
            id: p.id,
            name: Some(p.name),
            email: Some(p.email),
            education: p.education,
            points: Some(p.points),
        }
    }
}
