// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential refresh: single-flight coalescing, persistence, failure
//! handling.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use mytt_proxy::models::credential::decode_blob;
use mytt_proxy::services::token::CREDENTIAL_KEY;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

fn refresh_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_concurrent_triggers_coalesce_into_one_exchange() {
    let upstream = MockServer::start().await;
    let now = Utc::now().timestamp();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::refresh_response_json(now + 86400)),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    // Inside the force window: both triggers want a refresh.
    let test = common::create_test_app(&upstream.uri(), Some(common::credential(Some(now + 1800))));

    let (a, b) = tokio::join!(
        test.state.tokens.ensure_fresh(),
        test.state.tokens.ensure_fresh()
    );

    // Both callers end up with the refreshed credential, from one exchange.
    assert_eq!(a.unwrap().access_token, "refreshed_access");
    assert_eq!(b.unwrap().access_token, "refreshed_access");
}

#[tokio::test]
async fn test_manual_refresh_persists_new_blob() {
    let upstream = MockServer::start().await;
    let now = Utc::now().timestamp();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::refresh_response_json(now + 86400)),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let test = common::create_test_app(&upstream.uri(), Some(common::credential(Some(now + 86400))));

    let response = test.app.clone().oneshot(refresh_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["refreshed"], true);
    assert_eq!(json["expires_at"], now + 86400);

    // Memory and file agree on the new credential.
    let current = test.state.tokens.store().current().unwrap();
    assert_eq!(current.access_token, "refreshed_access");

    let contents = std::fs::read_to_string(&test.state.config.credential_file).unwrap();
    let blob = contents
        .lines()
        .find_map(|l| l.strip_prefix(&format!("{}=", CREDENTIAL_KEY)))
        .expect("persisted blob line");
    let persisted = decode_blob(Some(blob)).into_credential().unwrap();
    assert_eq!(persisted, current);
}

#[tokio::test]
async fn test_rejected_refresh_keeps_old_credential() {
    let upstream = MockServer::start().await;
    let now = Utc::now().timestamp();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid refresh token"))
        .mount(&upstream)
        .await;

    let old = common::credential(Some(now + 86400));
    let test = common::create_test_app(&upstream.uri(), Some(old.clone()));

    let response = test.app.clone().oneshot(refresh_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(test.state.tokens.store().current(), Some(old));
}

#[tokio::test]
async fn test_refresh_without_credential_is_unauthorized() {
    let upstream = MockServer::start().await;
    let test = common::create_test_app(&upstream.uri(), None);

    let response = test.app.oneshot(refresh_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_refresh_token_fails_before_network() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let now = Utc::now().timestamp();
    let mut cred = common::credential(Some(now + 1800));
    cred.refresh_token = None;

    let test = common::create_test_app(&upstream.uri(), Some(cred));

    let response = test.app.oneshot(refresh_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = common::body_json(response).await;
    assert_eq!(json["error"], "missing_refresh_token");
}

#[tokio::test]
async fn test_failed_refresh_degrades_to_per_call_failure() {
    let upstream = MockServer::start().await;
    let now = Utc::now().timestamp();

    // Refresh fails, the stale credential stays in place...
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstream)
        .await;

    // ...and the authenticated call then fails individually upstream.
    Mock::given(method("GET"))
        .and(path("/api/ttr/player/NU1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&upstream)
        .await;

    let expired = common::credential(Some(now - 60));
    let test = common::create_test_app(&upstream.uri(), Some(expired.clone()));

    let response = test
        .app
        .oneshot(
            Request::builder()
                .uri("/api/ttr/player/NU1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // The endpoint reports the failure in-band; the process keeps serving.
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["ttr"], serde_json::Value::Null);
    assert!(json["error"].as_str().unwrap().contains("401"));

    assert_eq!(test.state.tokens.store().current(), Some(expired));
}
