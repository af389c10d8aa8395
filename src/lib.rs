// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Course-Session: signed-in user state for a course learning app
//!
//! This crate keeps the signed-in user's profile and reward points in
//! sync with a Supabase-style backend (identity service + table store).

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

use db::PostgrestStore;
use services::{GoTrueClient, SessionManager};

/// Session manager wired to the HTTP backend.
pub type AppSession = SessionManager<GoTrueClient, PostgrestStore>;
