// ABOUTME: Authorization-request transient store tests: cookie attributes and round trips
// ABOUTME: Corrupt or absent cookies read as no prior request, never as an error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use clubroom::constants::cookies::AUTH_REQUEST_COOKIE;
use clubroom::oauth::request_store::{AuthorizationRequest, AuthorizationRequestStore};

use common::init_test_logging;

fn sample_request() -> AuthorizationRequest {
    AuthorizationRequest::new(
        "kakao".to_owned(),
        "nonce-123".to_owned(),
        Some("/welcome".to_owned()),
    )
}

/// Pull the cookie value out of a Set-Cookie header and re-wrap it as a
/// request Cookie header, the way a browser would echo it back
fn echo_cookie(response_headers: &HeaderMap) -> HeaderMap {
    let set_cookie = response_headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    let pair = set_cookie.split(';').next().unwrap();

    let mut request_headers = HeaderMap::new();
    request_headers.insert(header::COOKIE, pair.parse().unwrap());
    request_headers
}

#[test]
fn save_writes_a_scoped_short_lived_cookie() {
    init_test_logging();
    let mut headers = HeaderMap::new();
    AuthorizationRequestStore::save(Some(&sample_request()), &mut headers);

    let cookie = headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();

    assert!(cookie.starts_with(&format!("{AUTH_REQUEST_COOKIE}=")));
    assert!(cookie.contains("Max-Age=180"));
    assert!(cookie.contains("Path=/oauth2"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[test]
fn state_round_trips_through_the_cookie() {
    init_test_logging();
    let request = sample_request();

    let mut response_headers = HeaderMap::new();
    AuthorizationRequestStore::save(Some(&request), &mut response_headers);
    let request_headers = echo_cookie(&response_headers);

    let loaded = AuthorizationRequestStore::load(&request_headers).unwrap();
    assert_eq!(loaded, request);
}

#[test]
fn absent_cookie_loads_as_none() {
    init_test_logging();
    assert_eq!(AuthorizationRequestStore::load(&HeaderMap::new()), None);
}

#[test]
fn corrupt_cookie_loads_as_none() {
    init_test_logging();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        format!("{AUTH_REQUEST_COOKIE}=%%%not-base64%%%")
            .parse()
            .unwrap(),
    );
    assert_eq!(AuthorizationRequestStore::load(&headers), None);

    // Valid base64 of something that is not the payload
    let garbage = URL_SAFE_NO_PAD.encode(b"{\"hello\":\"world\"}");
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        format!("{AUTH_REQUEST_COOKIE}={garbage}").parse().unwrap(),
    );
    assert_eq!(AuthorizationRequestStore::load(&headers), None);
}

#[test]
fn unknown_payload_version_loads_as_none() {
    init_test_logging();
    let mut request = sample_request();

    let mut response_headers = HeaderMap::new();
    AuthorizationRequestStore::save(Some(&request), &mut response_headers);

    // Re-encode the same payload at a future version
    request.version = 99;
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&request).unwrap());
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        format!("{AUTH_REQUEST_COOKIE}={payload}").parse().unwrap(),
    );

    assert_eq!(AuthorizationRequestStore::load(&headers), None);
}

#[test]
fn saving_none_clears_the_cookie() {
    init_test_logging();
    let mut headers = HeaderMap::new();
    AuthorizationRequestStore::save(None, &mut headers);

    let cookie = headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(cookie.contains("Max-Age=0"));
}

#[test]
fn remove_returns_the_state_and_expires_the_cookie() {
    init_test_logging();
    let request = sample_request();

    let mut response_headers = HeaderMap::new();
    AuthorizationRequestStore::save(Some(&request), &mut response_headers);
    let request_headers = echo_cookie(&response_headers);

    let mut consume_headers = HeaderMap::new();
    let removed =
        AuthorizationRequestStore::remove(&request_headers, &mut consume_headers).unwrap();
    assert_eq!(removed, request);

    // Consumption eagerly retires the cookie rather than waiting out the TTL
    let cleared = consume_headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(cleared.contains("Max-Age=0"));
}

#[test]
fn remove_without_state_writes_no_cookie() {
    init_test_logging();
    let mut consume_headers = HeaderMap::new();
    let removed = AuthorizationRequestStore::remove(&HeaderMap::new(), &mut consume_headers);

    assert_eq!(removed, None);
    assert!(consume_headers.get(header::SET_COOKIE).is_none());
}
