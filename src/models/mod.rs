// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod course;
pub mod session;
pub mod user;

pub use course::{CompletedCourse, CourseProgress};
pub use session::{AuthChange, AuthEvent, IdentityUser, Session, SignupMetadata, SignupResponse};
pub use user::{NewProfile, ProfileRow, User};
