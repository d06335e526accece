// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregation layer: fans out per-player upstream calls and merges the
//! partial results into `PlayerRecord`s.
//!
//! This is the only place where per-call failure turns into optional
//! fields plus recorded errors; everything below it returns plain
//! `Result`s per upstream call.

use crate::error::AppError;
use crate::models::credential::Credential;
use crate::models::{EnrichedSearchResult, PlayerRecord, SearchEntry};
use crate::services::mytt::{MyttClient, MIN_QUERY_CHARS};
use crate::services::token::TokenManager;
use futures_util::{stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Upper bound on concurrent per-player rating lookups. The upstream's
/// search quota is 90 requests/hour; hammering it with a whole page of
/// parallel lookups gets the proxy rate limited.
const MAX_CONCURRENT_ENRICHMENTS: usize = 5;

/// Page size for the derived surname search in [`PlayerEnricher::player_by_nuid`].
const DERIVED_SEARCH_PAGESIZE: u32 = 25;

/// Builds unified player records from search, rating and history calls.
#[derive(Clone)]
pub struct PlayerEnricher {
    client: MyttClient,
    tokens: Arc<TokenManager>,
}

impl PlayerEnricher {
    pub fn new(client: MyttClient, tokens: Arc<TokenManager>) -> Self {
        Self { client, tokens }
    }

    /// Search players and enrich every entry with current and
    /// previous-quarter ratings.
    ///
    /// Per-entry lookups run concurrently (bounded), and results are merged
    /// back in search order — completion order never reorders the output.
    /// Only a failed base search is fatal; per-entry failures become
    /// `field_errors` on the affected record.
    pub async fn enriched_search(
        &self,
        query: &str,
        page: u32,
        pagesize: u32,
    ) -> Result<EnrichedSearchResult, AppError> {
        let search = self.client.search_players(query, page, pagesize).await?;

        // One credential snapshot for the whole logical request; a refresh
        // triggered by a concurrent request cannot tear these lookups.
        let credential = self.tokens.ensure_fresh().await;

        let enrichments: Vec<_> = search
            .results
            .iter()
            .map(|entry| self.enrich_entry(entry, credential.as_ref()))
            .collect();

        let results = stream::iter(enrichments)
            .buffered(MAX_CONCURRENT_ENRICHMENTS)
            .collect::<Vec<PlayerRecord>>()
            .await;

        Ok(EnrichedSearchResult {
            results,
            page: search.page,
            pagesize: search.pagesize,
            total_count: search.total_count,
            pages_count: search.pages_count,
        })
    }

    /// Enrich one search entry. Never fails; unresolved fields carry an
    /// entry in `field_errors` instead.
    async fn enrich_entry(
        &self,
        entry: &SearchEntry,
        credential: Option<&Credential>,
    ) -> PlayerRecord {
        let mut record = PlayerRecord::from_entry(entry);

        let nuid = match entry.canonical_id() {
            Some(nuid) => nuid,
            None => {
                let msg = "search entry has no player id".to_string();
                record.field_errors.insert("ttr".to_string(), msg.clone());
                record.field_errors.insert("q_ttr".to_string(), msg);
                return record;
            }
        };

        let credential = match credential {
            Some(cred) => cred,
            None => {
                let msg = AppError::Unauthorized.to_string();
                record.field_errors.insert("ttr".to_string(), msg.clone());
                record.field_errors.insert("q_ttr".to_string(), msg);
                return record;
            }
        };

        let (rating, history) = tokio::join!(
            self.client.get_rating(credential, nuid),
            self.client.get_rating_history(credential, nuid),
        );

        match rating {
            Ok(info) => record.ttr = info.ttr,
            Err(e) => {
                tracing::debug!(nuid, error = %e, "Rating lookup failed");
                record.field_errors.insert("ttr".to_string(), e.to_string());
            }
        }

        match history {
            Ok(history) => record.q_ttr = history.vq_ttr,
            Err(e) => {
                tracing::debug!(nuid, error = %e, "Rating history lookup failed");
                record
                    .field_errors
                    .insert("q_ttr".to_string(), e.to_string());
            }
        }

        record
    }

    /// Build a full record for a single player id.
    ///
    /// The rating lookup doubles as the existence check: if it fails, the
    /// player is reported as not found. History and the derived surname
    /// search (which recovers the licence club) degrade gracefully.
    pub async fn player_by_nuid(&self, nuid: &str) -> Result<PlayerRecord, AppError> {
        let credential = self
            .tokens
            .ensure_fresh()
            .await
            .ok_or(AppError::Unauthorized)?;

        let (rating, history) = tokio::join!(
            self.client.get_rating(&credential, nuid),
            self.client.get_rating_history(&credential, nuid),
        );

        let rating = rating.map_err(|e| {
            tracing::debug!(nuid, error = %e, "Rating lookup failed, treating player as not found");
            AppError::NotFound(format!("Player {}", nuid))
        })?;

        let mut record = PlayerRecord {
            id: Some(nuid.to_string()),
            firstname: None,
            lastname: None,
            club: None,
            licence_club: None,
            ttr: rating.ttr,
            q_ttr: None,
            field_errors: BTreeMap::new(),
        };

        let mut surname = None;
        match history {
            Ok(history) => {
                record.q_ttr = history.vq_ttr;
                record.club = history.club_name;
                if let Some(name) = history.person_name.as_deref() {
                    let (first, last) = split_display_name(name);
                    record.firstname = first;
                    surname = last.clone();
                    record.lastname = last;
                }
            }
            Err(e) => {
                record
                    .field_errors
                    .insert("q_ttr".to_string(), e.to_string());
            }
        }

        self.recover_licence_club(&mut record, nuid, surname.as_deref())
            .await;

        Ok(record)
    }

    /// Derived third call: search by surname and join the matching entry to
    /// recover the licence club, which neither rating endpoint returns.
    async fn recover_licence_club(
        &self,
        record: &mut PlayerRecord,
        nuid: &str,
        surname: Option<&str>,
    ) {
        let surname = match surname {
            Some(s) if s.chars().count() >= MIN_QUERY_CHARS => s,
            _ => {
                record.field_errors.insert(
                    "licence_club".to_string(),
                    "no usable surname to search by".to_string(),
                );
                return;
            }
        };

        match self
            .client
            .search_players(surname, 1, DERIVED_SEARCH_PAGESIZE)
            .await
        {
            Ok(result) => match result
                .results
                .iter()
                .find(|e| e.canonical_id() == Some(nuid))
            {
                Some(entry) => {
                    record.licence_club = entry.licence_club.clone();
                    if record.club.is_none() {
                        record.club = entry.club_name.clone();
                    }
                }
                None => {
                    record.field_errors.insert(
                        "licence_club".to_string(),
                        format!("player {} not in search results for '{}'", nuid, surname),
                    );
                }
            },
            Err(e) => {
                tracing::debug!(nuid, error = %e, "Derived surname search failed");
                record
                    .field_errors
                    .insert("licence_club".to_string(), e.to_string());
            }
        }
    }
}

/// Split a display name into (given names, surname). The surname is the
/// last whitespace-separated token.
fn split_display_name(name: &str) -> (Option<String>, Option<String>) {
    let mut parts: Vec<&str> = name.split_whitespace().collect();
    let last = parts.pop().map(str::to_string);
    let first = if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    };
    (first, last)
}
