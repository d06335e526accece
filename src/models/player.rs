// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Player-facing data models: upstream response shapes and the aggregated
//! record this proxy builds from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of an upstream player search. Carries no rating fields; those
/// are joined in by the enricher via the entry's canonical identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEntry {
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub club_name: Option<String>,
    /// Club the player's licence is registered with, when it differs.
    #[serde(default)]
    pub licence_club: Option<String>,
    #[serde(default)]
    pub internal_id: Option<String>,
    #[serde(default)]
    pub nuid: Option<String>,
}

impl SearchEntry {
    /// Canonical player identifier: `internal_id` with `nuid` fallback.
    pub fn canonical_id(&self) -> Option<&str> {
        self.internal_id.as_deref().or(self.nuid.as_deref())
    }
}

/// Upstream search response with pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub results: Vec<SearchEntry>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pagesize: u32,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub pages_count: u32,
}

/// Current TTR rating of a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingInfo {
    #[serde(default)]
    pub ttr: Option<i32>,
}

/// TTR history response; `vq_ttr` is the previous-quarter value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingHistory {
    #[serde(default)]
    pub vq_ttr: Option<i32>,
    #[serde(default)]
    pub person_name: Option<String>,
    #[serde(default)]
    pub club_name: Option<String>,
}

/// Aggregated player record built from up to three upstream calls.
///
/// Every field that could not be resolved is `None` plus an entry in
/// `field_errors`; partial upstream failure never drops the record.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRecord {
    pub id: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub club: Option<String>,
    pub licence_club: Option<String>,
    /// Current rating, from the rating endpoint.
    pub ttr: Option<i32>,
    /// Previous-quarter rating, from the history endpoint.
    pub q_ttr: Option<i32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: BTreeMap<String, String>,
}

impl PlayerRecord {
    /// Start a record from a search entry, rating fields unresolved.
    pub fn from_entry(entry: &SearchEntry) -> Self {
        Self {
            id: entry.canonical_id().map(str::to_string),
            firstname: entry.firstname.clone(),
            lastname: entry.lastname.clone(),
            club: entry.club_name.clone(),
            licence_club: entry.licence_club.clone(),
            ttr: None,
            q_ttr: None,
            field_errors: BTreeMap::new(),
        }
    }
}

/// Search response with entries enriched into full player records.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedSearchResult {
    pub results: Vec<PlayerRecord>,
    pub page: u32,
    pub pagesize: u32,
    pub total_count: u32,
    pub pages_count: u32,
}

/// One row of the public quarterly leaderboard snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterlyRank {
    #[serde(default)]
    pub nuid: Option<String>,
    #[serde(default)]
    pub internal_id: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub club: Option<String>,
    /// The federation rank column holds the quarterly (Q-TTR) value.
    #[serde(rename = "fedRank", default)]
    pub fed_rank: Option<i32>,
}
