// ABOUTME: Login outcome redirect tests: origin allow-listing and reason encoding
// ABOUTME: Any host or port escape must abort the redirect, fail-closed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use clubroom::errors::ErrorCode;
use clubroom::oauth::routes::{build_success_redirect, failure_redirect};

use common::{init_test_logging, test_config};

#[test]
fn default_success_redirect_lands_on_the_configured_path() {
    init_test_logging();
    let config = test_config();

    let url = build_success_redirect(&config.frontend, None, "tok-1").unwrap();
    assert_eq!(url, "http://localhost:3000/oauth/redirect?token=tok-1");
}

#[test]
fn same_origin_redirect_paths_are_allowed() {
    init_test_logging();
    let config = test_config();

    let url = build_success_redirect(&config.frontend, Some("/welcome"), "tok-2").unwrap();
    assert_eq!(url, "http://localhost:3000/welcome?token=tok-2");
}

#[test]
fn absolute_redirects_to_another_host_are_rejected() {
    init_test_logging();
    let config = test_config();

    let err =
        build_success_redirect(&config.frontend, Some("https://evil.example/x"), "tok").unwrap_err();
    assert_eq!(err.code, ErrorCode::RedirectRejected);
}

#[test]
fn protocol_relative_redirects_are_rejected() {
    init_test_logging();
    let config = test_config();

    // "//evil.example/x" resolves to a different host under URL joining
    let err =
        build_success_redirect(&config.frontend, Some("//evil.example/x"), "tok").unwrap_err();
    assert_eq!(err.code, ErrorCode::RedirectRejected);
}

#[test]
fn port_mismatches_are_rejected() {
    init_test_logging();
    let config = test_config();

    let err = build_success_redirect(
        &config.frontend,
        Some("http://localhost:9999/welcome"),
        "tok",
    )
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::RedirectRejected);
}

#[test]
fn scheme_changes_are_rejected() {
    init_test_logging();
    let config = test_config();

    let err = build_success_redirect(
        &config.frontend,
        Some("https://localhost:3000/welcome"),
        "tok",
    )
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::RedirectRejected);
}

#[test]
fn exact_same_origin_absolute_urls_are_allowed() {
    init_test_logging();
    let config = test_config();

    let url = build_success_redirect(
        &config.frontend,
        Some("http://localhost:3000/deep/page"),
        "tok-3",
    )
    .unwrap();
    assert_eq!(url, "http://localhost:3000/deep/page?token=tok-3");
}

#[test]
fn failure_redirect_percent_encodes_the_reason() {
    init_test_logging();
    let config = test_config();

    let url = failure_redirect(&config.frontend, "bad thing: 100%");
    assert!(url.starts_with("http://localhost:3000/oauth/error?error="));
    assert!(url.contains("bad%20thing%3A%20100%25"));
}
