// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-player rating routes.
//!
//! The single-field endpoints never fail on upstream errors: callers get
//! `{"ttr": null, "error": ...}` so a rating column can stay empty without
//! breaking the page. Only the aggregated player endpoint turns a missing
//! rating into a 404.

use crate::error::{AppError, Result};
use crate::models::{PlayerRecord, QuarterlyRank};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ttr/player/{nuid}", get(get_rating))
        .route("/api/ttr/history/{nuid}", get(get_rating_history))
        .route("/api/player/{nuid}", get(get_player))
        .route("/api/qttr/player/{nuid}", get(get_quarterly_rating))
}

#[derive(Serialize)]
pub struct RatingResponse {
    pub ttr: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Current TTR value. Requires a credential; upstream failure yields
/// `{ttr: null, error}` instead of an error status.
async fn get_rating(
    State(state): State<Arc<AppState>>,
    Path(nuid): Path<String>,
) -> Result<Json<RatingResponse>> {
    let credential = state
        .tokens
        .ensure_fresh()
        .await
        .ok_or(AppError::Unauthorized)?;

    tracing::debug!(nuid = %nuid, "Fetching TTR");

    let response = match state.mytt.get_rating(&credential, &nuid).await {
        Ok(info) => RatingResponse {
            ttr: info.ttr,
            error: None,
        },
        Err(e) => RatingResponse {
            ttr: None,
            error: Some(e.to_string()),
        },
    };

    Ok(Json(response))
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub vq_ttr: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// TTR history (previous-quarter value). Same never-throw shape.
async fn get_rating_history(
    State(state): State<Arc<AppState>>,
    Path(nuid): Path<String>,
) -> Result<Json<HistoryResponse>> {
    let credential = state
        .tokens
        .ensure_fresh()
        .await
        .ok_or(AppError::Unauthorized)?;

    tracing::debug!(nuid = %nuid, "Fetching TTR history");

    let response = match state.mytt.get_rating_history(&credential, &nuid).await {
        Ok(history) => HistoryResponse {
            vq_ttr: history.vq_ttr,
            person_name: history.person_name,
            club_name: history.club_name,
            error: None,
        },
        Err(e) => HistoryResponse {
            vq_ttr: None,
            person_name: None,
            club_name: None,
            error: Some(e.to_string()),
        },
    };

    Ok(Json(response))
}

/// Aggregated player record; 404 when the rating lookup cannot find the
/// player.
async fn get_player(
    State(state): State<Arc<AppState>>,
    Path(nuid): Path<String>,
) -> Result<Json<PlayerRecord>> {
    tracing::debug!(nuid = %nuid, "Fetching aggregated player record");

    let record = state.enricher.player_by_nuid(&nuid).await?;
    Ok(Json(record))
}

#[derive(Serialize)]
pub struct QuarterlyRatingResponse {
    pub q_ttr: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<QuarterlyRank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Best-effort quarterly value from the public leaderboard snapshot.
/// Unauthenticated; a miss or upstream failure is reported in-band.
async fn get_quarterly_rating(
    State(state): State<Arc<AppState>>,
    Path(nuid): Path<String>,
) -> Result<Json<QuarterlyRatingResponse>> {
    tracing::debug!(nuid = %nuid, "Fetching quarterly rating from leaderboard snapshot");

    let response = match state.mytt.find_quarterly_rank(&nuid).await {
        Ok(Some(player)) => QuarterlyRatingResponse {
            q_ttr: player.fed_rank,
            player: Some(player),
            error: None,
        },
        Ok(None) => QuarterlyRatingResponse {
            q_ttr: None,
            player: None,
            error: Some("player not in the current leaderboard snapshot".to_string()),
        },
        Err(e) => QuarterlyRatingResponse {
            q_ttr: None,
            player: None,
            error: Some(e.to_string()),
        },
    };

    Ok(Json(response))
}
