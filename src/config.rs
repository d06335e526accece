// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The auth credential itself (`MYTISCHTENNIS_JWT`) is not part of this
//! struct: it is decoded and owned by the token store, which also rewrites
//! it in `credential_file` after each refresh.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the myTischtennis API
    pub upstream_base_url: String,
    /// Base URL of the auth endpoint (defaults to the upstream base)
    pub auth_base_url: String,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Env-style file the refreshed credential blob is written back to
    pub credential_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let upstream_base_url = env::var("MYTT_BASE_URL")
            .unwrap_or_else(|_| "https://www.mytischtennis.de".to_string());

        Ok(Self {
            auth_base_url: env::var("MYTT_AUTH_BASE_URL")
                .unwrap_or_else(|_| upstream_base_url.clone()),
            upstream_base_url,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),
            credential_file: env::var("CREDENTIAL_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".env")),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            upstream_base_url: "http://localhost:0".to_string(),
            auth_base_url: "http://localhost:0".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 3001,
            credential_file: PathBuf::from(".env.test"),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
