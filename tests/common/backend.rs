// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fake auth + PostgREST backend served by axum on a random local port.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "secret-pass";
pub const USER_ID: &str = "2b5c3d1e-0000-4000-8000-000000000001";

/// One request as seen by the fake backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: &'static str,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub apikey: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Inner {
    profiles: Mutex<Vec<Value>>,
    requests: Mutex<Vec<Recorded>>,
    reject_refresh: AtomicBool,
    fail_profiles: AtomicBool,
}

#[derive(Clone, Default)]
pub struct Backend {
    inner: Arc<Inner>,
}

impl Backend {
    pub fn seed_profile(&self, row: Value) {
        self.inner.profiles.lock().unwrap().push(row);
    }

    pub fn profiles(&self) -> Vec<Value> {
        self.inner.profiles.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn set_reject_refresh(&self, reject: bool) {
        self.inner.reject_refresh.store(reject, Ordering::SeqCst);
    }

    pub fn set_fail_profiles(&self, fail: bool) {
        self.inner.fail_profiles.store(fail, Ordering::SeqCst);
    }

    fn record(
        &self,
        method: &'static str,
        path: &'static str,
        query: &HashMap<String, String>,
        headers: &HeaderMap,
        body: Value,
    ) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.inner.requests.lock().unwrap().push(Recorded {
            method,
            path,
            query: query.clone(),
            authorization: header("authorization"),
            apikey: header("apikey"),
            body,
        });
    }

    /// Serve the fake backend and return its base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/logout", post(logout))
            .route(
                "/rest/v1/profiles",
                get(select_profiles)
                    .post(insert_profile)
                    .patch(update_profile),
            )
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("No local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake backend failed");
        });
        format!("http://{}", addr)
    }
}

pub fn session_json(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": format!("refresh-{}", access_token),
        "user": { "id": USER_ID, "email": EMAIL, "user_metadata": {} }
    })
}

async fn token(
    State(backend): State<Backend>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.record("POST", "/auth/v1/token", &query, &headers, body.clone());

    match query.get("grant_type").map(String::as_str) {
        Some("password") if body["email"] == EMAIL && body["password"] == PASSWORD => {
            Json(session_json("access-1")).into_response()
        }
        Some("password") => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "code": 400,
                "error_code": "invalid_credentials",
                "msg": "Invalid login credentials"
            })),
        )
            .into_response(),
        Some("refresh_token") if !backend.inner.reject_refresh.load(Ordering::SeqCst) => {
            Json(session_json("access-refreshed")).into_response()
        }
        Some("refresh_token") => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "code": 400,
                "error_code": "refresh_token_not_found",
                "msg": "Invalid Refresh Token: Refresh Token Not Found"
            })),
        )
            .into_response(),
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn signup(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.record("POST", "/auth/v1/signup", &HashMap::new(), &headers, body.clone());

    if body["email"] == EMAIL {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "code": 422,
                "error_code": "user_already_exists",
                "msg": "User already registered"
            })),
        )
            .into_response();
    }

    Json(json!({
        "id": "new-user-id",
        "email": body["email"],
        "user_metadata": body["data"]
    }))
    .into_response()
}

async fn logout(State(backend): State<Backend>, headers: HeaderMap) -> StatusCode {
    backend.record("POST", "/auth/v1/logout", &HashMap::new(), &headers, Value::Null);
    StatusCode::NO_CONTENT
}

fn id_filter(query: &HashMap<String, String>) -> Option<String> {
    query
        .get("id")
        .and_then(|v| v.strip_prefix("eq."))
        .map(str::to_string)
}

async fn select_profiles(
    State(backend): State<Backend>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    backend.record("GET", "/rest/v1/profiles", &query, &headers, Value::Null);

    if backend.inner.fail_profiles.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let id = id_filter(&query);
    let rows: Vec<Value> = backend
        .profiles()
        .into_iter()
        .filter(|row| id.as_deref().map_or(true, |id| row["id"] == id))
        .collect();
    Json(rows).into_response()
}

async fn insert_profile(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    backend.record("POST", "/rest/v1/profiles", &HashMap::new(), &headers, body.clone());
    backend.seed_profile(body);
    StatusCode::CREATED
}

async fn update_profile(
    State(backend): State<Backend>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    backend.record("PATCH", "/rest/v1/profiles", &query, &headers, body.clone());

    let Some(id) = id_filter(&query) else {
        return StatusCode::BAD_REQUEST;
    };
    let mut profiles = backend.inner.profiles.lock().unwrap();
    for row in profiles.iter_mut().filter(|row| row["id"] == id.as_str()) {
        row["points"] = body["points"].clone();
    }
    StatusCode::NO_CONTENT
}
