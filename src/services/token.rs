// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential lifecycle: storage, expiry classification, refresh.
//!
//! `TokenStore` owns the single process-wide credential: an in-memory
//! snapshot plus the durable copy in the env-style configuration file.
//! `TokenManager` classifies it against the expiry windows and funnels all
//! refresh triggers (periodic tick, pre-call check, manual endpoint)
//! through one mutually exclusive refresh routine.

use crate::error::AppError;
use crate::models::credential::{decode_blob, encode_blob, Credential, DecodedBlob};
use crate::services::mytt::MyttClient;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

/// Configuration key the credential blob is stored under.
pub const CREDENTIAL_KEY: &str = "MYTISCHTENNIS_JWT";

/// Remaining lifetime below which a refresh is forced.
pub const FORCE_REFRESH_WINDOW_SECS: i64 = 3600;

/// Remaining lifetime below which the tick logs a warning. Must be larger
/// than the force window.
pub const WARN_WINDOW_SECS: i64 = 7200;

/// How often the background tick re-checks the credential.
pub const REFRESH_CHECK_INTERVAL: Duration = Duration::from_secs(300);

// ─────────────────────────────────────────────────────────────────────────────
// TokenStore
// ─────────────────────────────────────────────────────────────────────────────

/// Holds the credential in memory and persists it to the configuration file.
pub struct TokenStore {
    credential: RwLock<Option<Credential>>,
    file: PathBuf,
}

impl TokenStore {
    /// Create a store with an already-decoded credential.
    pub fn new(file: PathBuf, initial: Option<Credential>) -> Self {
        Self {
            credential: RwLock::new(initial),
            file,
        }
    }

    /// Create a store from the `MYTISCHTENNIS_JWT` environment value.
    ///
    /// A malformed blob logs a warning and behaves as "no credential";
    /// startup never fails on a bad blob.
    pub fn from_env(file: PathBuf) -> Self {
        let raw = std::env::var(CREDENTIAL_KEY).ok();
        let initial = match decode_blob(raw.as_deref()) {
            DecodedBlob::Decoded(cred) => {
                tracing::info!(
                    expires_at = ?cred.expires_at,
                    user = ?cred.user_email,
                    "Credential loaded from environment"
                );
                Some(cred)
            }
            DecodedBlob::Missing => {
                tracing::warn!(
                    "{} not set; authenticated endpoints will return 401",
                    CREDENTIAL_KEY
                );
                None
            }
            DecodedBlob::Malformed(reason) => {
                tracing::warn!(reason = %reason, "Ignoring malformed credential blob");
                None
            }
        };

        Self::new(file, initial)
    }

    /// Atomic snapshot of the current credential.
    pub fn current(&self) -> Option<Credential> {
        self.credential.read().map(|g| g.clone()).unwrap_or(None)
    }

    /// Persist a new credential: durable write first, then the in-memory
    /// snapshot. A failed write leaves both unchanged, so `current()` and
    /// the file never disagree.
    pub fn persist(&self, new: Credential) -> Result<(), AppError> {
        rewrite_env_key(&self.file, CREDENTIAL_KEY, &encode_blob(&new))?;

        let mut guard = self
            .credential
            .write()
            .map_err(|_| AppError::Persist("credential lock poisoned".to_string()))?;
        *guard = Some(new);
        Ok(())
    }
}

/// Rewrite (or append) a single `KEY=value` line in an env-style file.
///
/// The rewrite is idempotent and atomic: the new contents go to a temp file
/// in the same directory which then replaces the original.
fn rewrite_env_key(file: &Path, key: &str, value: &str) -> Result<(), AppError> {
    let existing = match std::fs::read_to_string(file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(AppError::Persist(format!("read {}: {}", file.display(), e))),
    };

    let prefix = format!("{}=", key);
    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();
    let new_line = format!("{}{}", prefix, value);

    match lines.iter_mut().find(|l| l.starts_with(&prefix)) {
        Some(line) => *line = new_line,
        None => lines.push(new_line),
    }

    let mut contents = lines.join("\n");
    contents.push('\n');

    let tmp = file.with_extension("tmp");
    std::fs::write(&tmp, contents)
        .map_err(|e| AppError::Persist(format!("write {}: {}", tmp.display(), e)))?;
    std::fs::rename(&tmp, file)
        .map_err(|e| AppError::Persist(format!("rename {}: {}", file.display(), e)))?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// TokenManager
// ─────────────────────────────────────────────────────────────────────────────

/// Credential state, recomputed on demand — never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Fresh,
    NearExpiry,
    Expired,
    NoCredential,
}

/// Decides when a refresh is due and performs it, exactly once at a time.
pub struct TokenManager {
    store: Arc<TokenStore>,
    client: MyttClient,
    force_window_secs: i64,
    warn_window_secs: i64,
    /// Serializes refresh attempts; the refresh token is single-use
    /// upstream, so a duplicate exchange would invalidate the in-flight one.
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(store: Arc<TokenStore>, client: MyttClient) -> Self {
        Self::with_windows(store, client, FORCE_REFRESH_WINDOW_SECS, WARN_WINDOW_SECS)
    }

    /// Constructor with explicit windows, for tests and tuning.
    pub fn with_windows(
        store: Arc<TokenStore>,
        client: MyttClient,
        force_window_secs: i64,
        warn_window_secs: i64,
    ) -> Self {
        Self {
            store,
            client,
            force_window_secs,
            warn_window_secs,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Classify the current credential at `now`.
    pub fn state_at(&self, now: DateTime<Utc>) -> AuthState {
        match self.store.current() {
            None => AuthState::NoCredential,
            Some(cred) => match cred.expires_at {
                // Unknown expiry: not refreshable on schedule, not expired.
                None => AuthState::Fresh,
                Some(exp) if exp <= now.timestamp() => AuthState::Expired,
                Some(_) if cred.is_near_expiry(now, self.force_window_secs) => {
                    AuthState::NearExpiry
                }
                Some(_) => AuthState::Fresh,
            },
        }
    }

    pub fn state(&self) -> AuthState {
        self.state_at(Utc::now())
    }

    /// On-demand check before an authenticated call: refresh if due, then
    /// return the credential snapshot to use for this logical request.
    ///
    /// A refresh failure is logged and the stale credential is returned —
    /// the individual upstream call fails instead of the whole process.
    pub async fn ensure_fresh(&self) -> Option<Credential> {
        match self.state() {
            AuthState::Fresh => {}
            AuthState::NoCredential => return None,
            AuthState::Expired | AuthState::NearExpiry => {
                if let Err(e) = self.refresh_if_due().await {
                    tracing::warn!(error = %e, "Credential refresh failed, keeping stale credential");
                }
            }
        }
        self.store.current()
    }

    /// Manual refresh trigger. Always performs an exchange (serialized with
    /// any in-flight attempt) and propagates failure to the caller.
    pub async fn refresh_now(&self) -> Result<Credential, AppError> {
        let _guard = self.refresh_lock.lock().await;
        self.do_refresh().await
    }

    /// Periodic tick: force-refresh when due, warn when the warn window is
    /// entered. Never fails — errors are logged and the tick continues.
    pub async fn tick(&self) {
        let now = Utc::now();
        match self.state_at(now) {
            AuthState::Expired | AuthState::NearExpiry => {
                if let Err(e) = self.refresh_if_due().await {
                    tracing::warn!(error = %e, "Scheduled credential refresh failed");
                }
            }
            AuthState::Fresh => {
                if let Some(cred) = self.store.current() {
                    if cred.is_near_expiry(now, self.warn_window_secs) {
                        tracing::warn!(
                            expires_in_secs = ?cred.expires_in_secs(now),
                            "Credential expires soon"
                        );
                    }
                }
            }
            AuthState::NoCredential => {}
        }
    }

    /// Refresh under the single-flight lock, re-checking the state after
    /// acquisition: a trigger that waited behind an in-flight refresh
    /// coalesces with it instead of issuing a second exchange.
    async fn refresh_if_due(&self) -> Result<(), AppError> {
        let _guard = self.refresh_lock.lock().await;

        match self.state() {
            AuthState::Expired | AuthState::NearExpiry => {
                self.do_refresh().await?;
                Ok(())
            }
            // Another task already refreshed while we waited.
            AuthState::Fresh | AuthState::NoCredential => Ok(()),
        }
    }

    /// One exchange + persist. Callers must hold `refresh_lock`.
    ///
    /// If persistence fails the refreshed credential is dropped: memory and
    /// durable storage stay consistent, and the refresh counts as failed.
    async fn do_refresh(&self) -> Result<Credential, AppError> {
        let current = self.store.current().ok_or(AppError::Unauthorized)?;
        let refreshed = self.client.refresh_credential(&current).await?;
        self.store.persist(refreshed.clone())?;

        tracing::info!(
            expires_at = ?refreshed.expires_at,
            "Credential refreshed and persisted"
        );
        Ok(refreshed)
    }
}

/// Spawn the background expiry check.
pub fn spawn_refresh_task(
    manager: Arc<TokenManager>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately, checking the startup credential.
        loop {
            ticker.tick().await;
            manager.tick().await;
        }
    })
}
