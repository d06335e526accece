// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Player search routes: plain upstream passthrough and the enriched
//! variant with per-player rating lookups.

use crate::error::{AppError, Result};
use crate::models::{EnrichedSearchResult, SearchResult};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/search/players", post(search_players))
        .route("/api/search/players/ttr", post(search_players_with_ttr))
}

/// Search request body. Mirrors the upstream parameters; the pagesize cap
/// is the upstream's own limit.
#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 3, message = "query must be at least 3 characters long"))]
    pub query: String,
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_pagesize")]
    #[validate(range(min = 1, max = 50, message = "pagesize must be between 1 and 50"))]
    pub pagesize: u32,
}

fn default_page() -> u32 {
    1
}
fn default_pagesize() -> u32 {
    10
}

impl SearchRequest {
    fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(self)
    }
}

/// Plain player search, passed through to the upstream.
async fn search_players(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResult>> {
    let req = body.validated()?;

    tracing::debug!(query = %req.query, page = req.page, pagesize = req.pagesize, "Player search");

    let result = state
        .mytt
        .search_players(&req.query, req.page, req.pagesize)
        .await?;

    Ok(Json(result))
}

/// Player search with every entry enriched by rating and history lookups.
async fn search_players_with_ttr(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<EnrichedSearchResult>> {
    let req = body.validated()?;

    tracing::debug!(
        query = %req.query,
        page = req.page,
        pagesize = req.pagesize,
        "Enriched player search"
    );

    let result = state
        .enricher
        .enriched_search(&req.query, req.page, req.pagesize)
        .await?;

    Ok(Json(result))
}
