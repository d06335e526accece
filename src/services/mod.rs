// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod enrich;
pub mod mytt;
pub mod token;

pub use enrich::PlayerEnricher;
pub use mytt::MyttClient;
pub use token::{spawn_refresh_task, AuthState, TokenManager, TokenStore};
