// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session logic and backend clients.

pub mod gotrue;
pub mod identity;
pub mod mock_identity;
pub mod notifier;
pub mod rewards;
pub mod session;

pub use gotrue::GoTrueClient;
pub use identity::{AuthSubscription, IdentityService, SharedSession, SubscriptionId};
pub use mock_identity::MockIdentity;
pub use notifier::{Notifier, RecordingNotifier, Toast, ToastVariant, TracingNotifier};
pub use rewards::{CompletionOutcome, CourseRewards};
pub use session::{SessionManager, SessionOptions, SessionState, SignupRequest};
