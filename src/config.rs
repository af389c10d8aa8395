// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use crate::services::session::SessionOptions;
use std::env;
use std::time::Duration;

/// Default delay before checking that the signup profile row exists.
pub const DEFAULT_RECONCILE_DELAY_MS: u64 = 1000;

/// Default points awarded for completing a course.
pub const DEFAULT_COURSE_REWARD_POINTS: i64 = 50;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend project URL (auth at `/auth/v1`, tables at `/rest/v1`)
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request
    pub supabase_anon_key: String,
    /// Fixed delay before signup profile reconciliation
    pub reconcile_delay: Duration,
    /// Points awarded on first completion of a course
    pub course_reward_points: i64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            reconcile_delay: Duration::from_millis(DEFAULT_RECONCILE_DELAY_MS),
            course_reward_points: DEFAULT_COURSE_REWARD_POINTS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            supabase_url: env::var("SUPABASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            reconcile_delay: Duration::from_millis(parse_or(
                "SIGNUP_RECONCILE_DELAY_MS",
                DEFAULT_RECONCILE_DELAY_MS,
            )?),
            course_reward_points: parse_or("COURSE_REWARD_POINTS", DEFAULT_COURSE_REWARD_POINTS)?,
        })
    }

    /// Session manager options derived from this config.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            reconcile_delay: self.reconcile_delay,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
