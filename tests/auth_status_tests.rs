// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth status reporting and the background expiry tick.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use mytt_proxy::models::credential::decode_blob;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

fn status_request() -> Request<Body> {
    Request::builder()
        .uri("/api/auth/status")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_status_reports_expiry_without_network() {
    // No mocks mounted: any upstream call would fail the JSON parse and
    // surface here, so a passing test shows no network was involved.
    let upstream = MockServer::start().await;
    let now = Utc::now().timestamp();

    let test = common::create_test_app(&upstream.uri(), Some(common::credential(Some(now + 1800))));

    let response = test.app.oneshot(status_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["authenticated"], true);
    assert_eq!(json["expires_at"], now + 1800);

    let expires_in_ms = json["expires_in_ms"].as_i64().unwrap();
    assert!((1_790_000..=1_800_000).contains(&expires_in_ms));
}

#[tokio::test]
async fn test_status_without_credential() {
    let upstream = MockServer::start().await;
    let test = common::create_test_app(&upstream.uri(), None);

    let response = test.app.oneshot(status_request()).await.unwrap();

    let json = common::body_json(response).await;
    assert_eq!(json["authenticated"], false);
    assert!(json.get("expires_at").is_none());
    assert!(json.get("expires_in_ms").is_none());
}

#[tokio::test]
async fn test_status_with_expired_credential() {
    let upstream = MockServer::start().await;
    let now = Utc::now().timestamp();

    let test = common::create_test_app(&upstream.uri(), Some(common::credential(Some(now - 60))));

    let response = test.app.oneshot(status_request()).await.unwrap();

    let json = common::body_json(response).await;
    assert_eq!(json["authenticated"], false);
    assert_eq!(json["expires_at"], now - 60);
    assert!(json.get("expires_in_ms").is_none());
}

#[tokio::test]
async fn test_malformed_blob_behaves_as_no_credential() {
    let upstream = MockServer::start().await;

    // Decoding is total: garbage yields "no credential", not a failure.
    let initial = decode_blob(Some("base64-%%%not-decodable%%%")).into_credential();
    assert!(initial.is_none());

    let test = common::create_test_app(&upstream.uri(), initial);

    let response = test.app.clone().oneshot(status_request()).await.unwrap();
    let json = common::body_json(response).await;
    assert_eq!(json["authenticated"], false);

    // Authenticated endpoints report missing credentials, not a crash.
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
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tick_inside_force_window_refreshes_once() {
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

    // 1800 s left, 3600 s force window: the tick must refresh.
    let test = common::create_test_app_with_windows(
        &upstream.uri(),
        Some(common::credential(Some(now + 1800))),
        3600,
        7200,
    );

    test.state.tokens.tick().await;
    // A second tick sees the refreshed credential and stays quiet.
    test.state.tokens.tick().await;

    let current = test.state.tokens.store().current().unwrap();
    assert_eq!(current.access_token, "refreshed_access");
    assert_eq!(current.expires_at, Some(now + 86400));
}

#[tokio::test]
async fn test_tick_outside_force_window_does_nothing() {
    let upstream = MockServer::start().await;
    let now = Utc::now().timestamp();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    // Two hours left with a one-hour force window: fresh, no refresh.
    let test = common::create_test_app_with_windows(
        &upstream.uri(),
        Some(common::credential(Some(now + 7200))),
        3600,
        7200,
    );

    test.state.tokens.tick().await;

    let current = test.state.tokens.store().current().unwrap();
    assert_eq!(current.access_token, "test_access");
}
