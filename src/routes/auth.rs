// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential status and manual refresh routes.

use crate::error::Result;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/status", get(auth_status))
        .route("/api/auth/refresh", post(auth_refresh))
}

#[derive(Serialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_ms: Option<i64>,
}

/// Report credential validity from the in-memory state. No network call.
async fn auth_status(State(state): State<Arc<AppState>>) -> Json<AuthStatusResponse> {
    let now = Utc::now();

    let response = match state.tokens.store().current() {
        Some(cred) if cred.is_valid(now) => AuthStatusResponse {
            authenticated: true,
            expires_at: cred.expires_at,
            expires_in_ms: cred.expires_in_secs(now).map(|s| s * 1000),
        },
        Some(cred) => AuthStatusResponse {
            authenticated: false,
            expires_at: cred.expires_at,
            expires_in_ms: None,
        },
        None => AuthStatusResponse {
            authenticated: false,
            expires_at: None,
            expires_in_ms: None,
        },
    };

    Json(response)
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub refreshed: bool,
    pub expires_at: Option<i64>,
}

/// Manually trigger a refresh exchange and persist the result.
async fn auth_refresh(State(state): State<Arc<AppState>>) -> Result<Json<RefreshResponse>> {
    tracing::info!("Manual credential refresh requested");

    let credential = state.tokens.refresh_now().await?;

    Ok(Json(RefreshResponse {
        refreshed: true,
        expires_at: credential.expires_at,
    }))
}
