// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The upstream auth credential and its persisted blob encoding.
//!
//! myTischtennis stores a Supabase-style session in a single cookie value:
//! the literal prefix `base64-` followed by base64-encoded JSON carrying the
//! access/refresh token pair and the expiry instant. The same encoding is
//! what lives in the `MYTISCHTENNIS_JWT` configuration key.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix tagging the blob encoding.
const BLOB_PREFIX: &str = "base64-";

/// A decoded upstream credential.
///
/// Replaced wholesale on every refresh; the fields are never mutated in
/// place, so concurrent readers only ever observe a complete value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Expiry instant in UTC seconds. `None` means unknown validity:
    /// the credential is neither valid nor near expiry.
    pub expires_at: Option<i64>,
    pub user_email: Option<String>,
}

impl Credential {
    /// True iff the expiry is known and strictly in the future.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => exp > now.timestamp(),
            None => false,
        }
    }

    /// True iff the credential is valid but expires within `window_secs`.
    pub fn is_near_expiry(&self, now: DateTime<Utc>, window_secs: i64) -> bool {
        match self.expires_at {
            Some(exp) => exp > now.timestamp() && exp - now.timestamp() < window_secs,
            None => false,
        }
    }

    /// Seconds until expiry (negative if already expired).
    pub fn expires_in_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|exp| exp - now.timestamp())
    }
}

/// Result of decoding a persisted credential blob.
///
/// Decoding is total: a bad blob is `Malformed`, never a panic or an error
/// that blocks startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedBlob {
    /// No blob configured.
    Missing,
    /// Blob decoded successfully.
    Decoded(Credential),
    /// Blob present but not decodable; treated as "no credential".
    Malformed(String),
}

impl DecodedBlob {
    /// The credential, if one was decoded.
    pub fn into_credential(self) -> Option<Credential> {
        match self {
            DecodedBlob::Decoded(cred) => Some(cred),
            DecodedBlob::Missing | DecodedBlob::Malformed(_) => None,
        }
    }
}

/// JSON payload inside the blob, as written by the upstream.
#[derive(Debug, Serialize, Deserialize)]
struct BlobPayload {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<BlobUser>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Decode a persisted blob value.
pub fn decode_blob(raw: Option<&str>) -> DecodedBlob {
    let raw = match raw {
        Some(r) if !r.trim().is_empty() => r.trim(),
        _ => return DecodedBlob::Missing,
    };

    let encoded = match raw.strip_prefix(BLOB_PREFIX) {
        Some(e) => e,
        None => return DecodedBlob::Malformed(format!("missing '{}' prefix", BLOB_PREFIX)),
    };

    let bytes = match BASE64.decode(encoded) {
        Ok(b) => b,
        Err(e) => return DecodedBlob::Malformed(format!("invalid base64: {}", e)),
    };

    let payload: BlobPayload = match serde_json::from_slice(&bytes) {
        Ok(p) => p,
        Err(e) => return DecodedBlob::Malformed(format!("invalid JSON payload: {}", e)),
    };

    DecodedBlob::Decoded(Credential {
        access_token: payload.access_token,
        refresh_token: payload.refresh_token,
        token_type: payload.token_type,
        expires_at: payload.expires_at,
        user_email: payload.user.and_then(|u| u.email),
    })
}

/// Encode a credential back into the persisted blob format.
///
/// `decode_blob(Some(&encode_blob(c)))` yields `c` again; the upstream
/// accepts the re-encoded value as a cookie.
pub fn encode_blob(credential: &Credential) -> String {
    let payload = BlobPayload {
        access_token: credential.access_token.clone(),
        refresh_token: credential.refresh_token.clone(),
        token_type: credential.token_type.clone(),
        expires_at: credential.expires_at,
        user: credential
            .user_email
            .clone()
            .map(|email| BlobUser { email: Some(email) }),
    };

    // BlobPayload contains no non-serializable types, so this cannot fail.
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    format!("{}{}", BLOB_PREFIX, BASE64.encode(json))
}
