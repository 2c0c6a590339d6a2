// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bearer-token authentication for `/api/v1`.

use super::AppState;
use crate::http_errors::ApiError;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const BEARER_PREFIX: &str = "Bearer ";

/// Reject requests whose bearer token does not match the configured one.
///
/// Requests pass through untouched when no token is configured.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = state.api_token.as_deref() {
        if !token_matches(request.headers(), expected) {
            return ApiError::Unauthorized.into_response();
        }
    }
    next.run(request).await
}

/// Whether `headers` carry `Authorization: Bearer <expected>`.
pub(crate) fn token_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .is_some_and(|provided| constant_time_eq(provided.trim(), expected))
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(provided: &str, expected: &str) -> bool {
    provided.len() == expected.len()
        && provided
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
