// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! myTischtennis API client.
//!
//! Handles:
//! - Player search (unauthenticated, form-encoded)
//! - TTR rating and rating history (cookie-authenticated)
//! - Credential refresh exchange against the auth endpoint
//! - Rate limit detection (the search API allows 90 requests/hour)
//! - Best-effort quarterly-rank lookup via the public leaderboard snapshot

use crate::error::AppError;
use crate::models::credential::{encode_blob, Credential};
use crate::models::{QuarterlyRank, RatingHistory, RatingInfo, SearchResult};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Minimum search query length enforced before any network call.
pub const MIN_QUERY_CHARS: usize = 3;

/// Upstream request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Cookie the upstream expects the session blob in.
const AUTH_COOKIE: &str = "sb-10-auth-token";

/// myTischtennis API client.
#[derive(Clone)]
pub struct MyttClient {
    http: reqwest::Client,
    base_url: String,
    auth_base_url: String,
}

impl MyttClient {
    /// Create a new client. `base_url` serves the data endpoints,
    /// `auth_base_url` the token refresh exchange.
    pub fn new(base_url: String, auth_base_url: String) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(default_headers())
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            auth_base_url,
        })
    }

    /// Search players by name or club. Unauthenticated.
    pub async fn search_players(
        &self,
        query: &str,
        page: u32,
        pagesize: u32,
    ) -> Result<SearchResult, AppError> {
        if query.chars().count() < MIN_QUERY_CHARS {
            return Err(AppError::BadRequest(
                "Search query must be at least 3 characters long".to_string(),
            ));
        }

        let url = format!("{}/api/search/players", self.base_url);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("query", query.to_string()),
                ("page", page.to_string()),
                ("pagesize", pagesize.to_string()),
            ])
            .send()
            .await
            .map_err(map_transport)?;

        self.check_response_json(response).await
    }

    /// Get a player's current TTR rating. Authenticated.
    pub async fn get_rating(
        &self,
        credential: &Credential,
        nuid: &str,
    ) -> Result<RatingInfo, AppError> {
        let url = format!("{}/api/ttr/player/{}", self.base_url, nuid);
        self.get_json_authed(&url, credential).await
    }

    /// Get a player's TTR history, including the previous-quarter value.
    /// Authenticated.
    pub async fn get_rating_history(
        &self,
        credential: &Credential,
        nuid: &str,
    ) -> Result<RatingHistory, AppError> {
        let url = format!("{}/api/ttr/history/{}", self.base_url, nuid);
        self.get_json_authed(&url, credential).await
    }

    /// Exchange the credential's refresh token for a new credential.
    ///
    /// Performs exactly one exchange call; the refresh token is single-use
    /// upstream, so callers must serialize invocations. Does not persist —
    /// that is the token manager's job.
    pub async fn refresh_credential(
        &self,
        credential: &Credential,
    ) -> Result<Credential, AppError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or(AppError::MissingRefreshToken)?;

        let url = format!("{}/auth/v1/token", self.auth_base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(map_transport)?;

        let refreshed: RefreshResponse = self.check_response_json(response).await?;

        Ok(Credential {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
            token_type: refreshed
                .token_type
                .unwrap_or_else(|| "bearer".to_string()),
            expires_at: refreshed.expires_at,
            user_email: refreshed.user.and_then(|u| u.email),
        })
    }

    /// Scan the public quarterly leaderboard snapshot for a player.
    ///
    /// The snapshot is a single unauthenticated page of up to 500 rows;
    /// players rated outside that range simply are not found. Best-effort.
    pub async fn find_quarterly_rank(
        &self,
        nuid: &str,
    ) -> Result<Option<QuarterlyRank>, AppError> {
        let url = format!("{}/api/andro-ranking", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("_data", "routes/$"),
                ("current-ranking", "no"),
                ("results-per-page", "500"),
                ("page", "1"),
            ])
            .send()
            .await
            .map_err(map_transport)?;

        let snapshot: RankingSnapshot = self.check_response_json(response).await?;

        let found = snapshot
            .block_loader_data
            .into_values()
            .flat_map(|block| block.data)
            .find(|p| {
                p.nuid.as_deref() == Some(nuid) || p.internal_id.as_deref() == Some(nuid)
            });

        Ok(found)
    }

    /// Authenticated GET with the session blob attached as cookie.
    ///
    /// The cookie value is re-encoded from the credential snapshot the
    /// caller captured, so a refresh landing mid-request cannot tear it.
    async fn get_json_authed<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        credential: &Credential,
    ) -> Result<T, AppError> {
        let cookie = format!("{}={}", AUTH_COOKIE, encode_blob(credential));
        let response = self
            .http
            .get(url)
            .header(header::COOKIE, cookie)
            .send()
            .await
            .map_err(map_transport)?;

        self.check_response_json(response).await
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("myTischtennis rate limit hit (429)");
                return Err(AppError::RateLimited);
            }

            if status.as_u16() == 400 {
                return Err(AppError::BadRequest(body));
            }

            return Err(AppError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| AppError::Upstream {
            status: status.as_u16(),
            body: format!("JSON parse error: {}", e),
        })
    }
}

/// Connectivity and timeout failures.
fn map_transport(e: reqwest::Error) -> AppError {
    AppError::Unreachable(e.to_string())
}

/// The upstream blocks requests without browser-shaped headers.
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("de-DE,de;q=0.9,en;q=0.8"),
    );
    headers.insert(
        header::ORIGIN,
        HeaderValue::from_static("https://www.mytischtennis.de"),
    );
    headers.insert(
        header::REFERER,
        HeaderValue::from_static("https://www.mytischtennis.de/"),
    );
    headers
}

/// Refresh exchange response from the auth endpoint.
#[derive(Debug, Clone, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<RefreshUser>,
}

#[derive(Debug, Clone, Deserialize)]
struct RefreshUser {
    #[serde(default)]
    email: Option<String>,
}

/// Quarterly leaderboard payload: one loader block keyed by route id.
#[derive(Debug, Deserialize)]
struct RankingSnapshot {
    #[serde(rename = "blockLoaderData", default)]
    block_loader_data: HashMap<String, RankingBlock>,
}

#[derive(Debug, Deserialize)]
struct RankingBlock {
    #[serde(default)]
    data: Vec<QuarterlyRank>,
}
