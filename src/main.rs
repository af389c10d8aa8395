// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course-Session command line client
//!
//! Mounts the session manager against the configured backend, runs one
//! account action and reports the resulting user state.
//!
//! Usage:
//!   course-session status
//!   course-session login <email> <password>
//!   course-session signup <name> <email> <password> [education]
//!   course-session logout
//!   course-session complete <email> <password> <course_id>
//!   course-session courses <email> <password>

use anyhow::{bail, Context};
use course_session::{
    config::Config,
    db::PostgrestStore,
    services::{CourseRewards, GoTrueClient, SessionManager, SignupRequest, TracingNotifier},
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for the change notification to populate the user.
const USER_WAIT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(url = %config.supabase_url, "Starting course-session");

    let args: Vec<String> = std::env::args().skip(1).collect();

    let identity = GoTrueClient::new(&config);
    let store = PostgrestStore::new(&config, identity.session_handle());
    let session = SessionManager::mount(
        identity,
        store,
        Arc::new(TracingNotifier),
        config.session_options(),
    )
    .await;

    let result = run(&session, &config, &args).await;
    session.teardown();
    result
}

async fn run(
    session: &course_session::AppSession,
    config: &Config,
    args: &[String],
) -> anyhow::Result<()> {
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["status"] => {}
        ["login", email, password] => {
            session.login(email, password).await?;
            wait_for_user(session, USER_WAIT).await;
        }
        ["signup", name, email, password, rest @ ..] => {
            let request = SignupRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                education: rest.first().map(|s| s.to_string()),
            };
            session.signup(&request).await?;
            wait_for_user(session, config.reconcile_delay + USER_WAIT).await;
        }
        ["logout"] => session.logout().await?,
        ["complete", email, password, course_id] => {
            session.login(email, password).await?;
            wait_for_user(session, USER_WAIT).await;
            let outcome = CourseRewards::new(session.clone())
                .complete_course(course_id, config.course_reward_points)
                .await
                .context("Failed to record course completion")?;
            tracing::info!(course_id = %course_id, ?outcome, "Completion processed");
        }
        ["courses", email, password] => {
            session.login(email, password).await?;
            wait_for_user(session, USER_WAIT).await;
            let completions = CourseRewards::new(session.clone())
                .completed_courses()
                .await
                .context("Failed to list completed courses")?;
            for completion in completions {
                tracing::info!(
                    course_id = %completion.course_id,
                    completed_at = %completion.completed_at,
                    "Completed course"
                );
            }
        }
        _ => bail!(
            "usage: course-session [status | login <email> <password> | \
             signup <name> <email> <password> [education] | logout | \
             complete <email> <password> <course_id> | courses <email> <password>]"
        ),
    }

    match session.user() {
        Some(user) => tracing::info!(
            user_id = %user.id,
            email = %user.email,
            name = %user.name,
            points = user.points,
            "Signed in"
        ),
        None => tracing::info!("Not signed in"),
    }
    Ok(())
}

/// Wait until the user view model is populated or `timeout` elapses.
async fn wait_for_user(session: &course_session::AppSession, timeout: Duration) {
    let mut rx = session.subscribe();
    let populated = tokio::time::timeout(timeout, rx.wait_for(|s| s.user.is_some())).await;
    if !matches!(populated, Ok(Ok(_))) {
        tracing::warn!(timeout_ms = timeout.as_millis() as u64, "User not populated yet");
    }
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("course_session=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
