// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! mytt-proxy: local proxy for the myTischtennis.de API.
//!
//! Holds and auto-refreshes the upstream auth credential, and aggregates
//! search, TTR and TTR-history calls into enriched player records.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::{MyttClient, PlayerEnricher, TokenManager};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tokens: Arc<TokenManager>,
    pub mytt: MyttClient,
    pub enricher: PlayerEnricher,
}
