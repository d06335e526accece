// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod credential;
pub mod player;

pub use credential::{decode_blob, encode_blob, Credential, DecodedBlob};
pub use player::{
    EnrichedSearchResult, PlayerRecord, QuarterlyRank, RatingHistory, RatingInfo, SearchEntry,
    SearchResult,
};
