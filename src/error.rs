// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No credential configured")]
    Unauthorized,

    #[error("Credential has no refresh token; a new login is required")]
    MissingRefreshToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Upstream rate limit reached (90 requests/hour)")]
    RateLimited,

    #[error("Upstream error: HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    #[error("Failed to persist credential: {0}")]
    Persist(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                Some("Set MYTISCHTENNIS_JWT or trigger POST /api/auth/refresh".to_string()),
            ),
            AppError::MissingRefreshToken => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "missing_refresh_token",
                Some(self.to_string()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                Some(self.to_string()),
            ),
            AppError::Upstream { status, body } => {
                tracing::warn!(status, body = %body, "Upstream error");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    Some(format!("HTTP {}: {}", status, body)),
                )
            }
            AppError::Unreachable(msg) => (
                StatusCode::BAD_GATEWAY,
                "upstream_unreachable",
                Some(msg.clone()),
            ),
            AppError::Persist(msg) => {
                tracing::error!(error = %msg, "Credential persistence failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "persist_error",
                    Some(msg.clone()),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
