// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use mytt_proxy::config::Config;
use mytt_proxy::models::credential::Credential;
use mytt_proxy::routes::create_router;
use mytt_proxy::services::token::{FORCE_REFRESH_WINDOW_SECS, WARN_WINDOW_SECS};
use mytt_proxy::services::{MyttClient, PlayerEnricher, TokenManager, TokenStore};
use mytt_proxy::AppState;
use std::sync::Arc;

/// Test application wired against a stub upstream.
pub struct TestApp {
    pub app: axum::Router,
    pub state: Arc<AppState>,
    /// Keeps the credential file directory alive for the test's duration.
    _dir: tempfile::TempDir,
}

/// A credential expiring at the given instant (unix seconds).
#[allow(dead_code)]
pub fn credential(expires_at: Option<i64>) -> Credential {
    Credential {
        access_token: "test_access".to_string(),
        refresh_token: Some("test_refresh".to_string()),
        token_type: "bearer".to_string(),
        expires_at,
        user_email: Some("player@example.com".to_string()),
    }
}

/// Create a test app with the default expiry windows.
#[allow(dead_code)]
pub fn create_test_app(upstream_url: &str, initial: Option<Credential>) -> TestApp {
    create_test_app_with_windows(
        upstream_url,
        initial,
        FORCE_REFRESH_WINDOW_SECS,
        WARN_WINDOW_SECS,
    )
}

/// Create a test app with explicit force/warn windows, pointing both the
/// data and auth base URLs at the stub upstream.
#[allow(dead_code)]
pub fn create_test_app_with_windows(
    upstream_url: &str,
    initial: Option<Credential>,
    force_window_secs: i64,
    warn_window_secs: i64,
) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut config = Config::test_default();
    config.upstream_base_url = upstream_url.to_string();
    config.auth_base_url = upstream_url.to_string();
    config.credential_file = dir.path().join(".env");

    let store = Arc::new(TokenStore::new(config.credential_file.clone(), initial));
    let mytt = MyttClient::new(
        config.upstream_base_url.clone(),
        config.auth_base_url.clone(),
    )
    .expect("client");

    let tokens = Arc::new(TokenManager::with_windows(
        store,
        mytt.clone(),
        force_window_secs,
        warn_window_secs,
    ));
    let enricher = PlayerEnricher::new(mytt.clone(), tokens.clone());

    let state = Arc::new(AppState {
        config,
        tokens,
        mytt,
        enricher,
    });

    TestApp {
        app: create_router(state.clone()),
        state,
        _dir: dir,
    }
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// The blob-encoded JSON payload a refresh exchange returns.
#[allow(dead_code)]
pub fn refresh_response_json(expires_at: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": "refreshed_access",
        "refresh_token": "refreshed_refresh",
        "token_type": "bearer",
        "expires_at": expires_at,
        "user": { "email": "player@example.com" }
    })
}
