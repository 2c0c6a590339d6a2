// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error kind mapping to HTTP status codes.
//!
//! Every error the lifecycle engine surfaces carries a short kind tag (see
//! [`crate::errors`]). This module maps those tags to HTTP status codes and
//! renders errors as JSON bodies of the form
//! `{"error": "<message>", "kind": "<kind>"}`.
//!
//! # Usage
//!
//! ```rust
//! use axum::http::StatusCode;
//! use bindconf::http_errors::status_for_kind;
//!
//! assert_eq!(status_for_kind("BackupMissing"), StatusCode::NOT_FOUND);
//! assert_eq!(status_for_kind("ReloadAfterWriteFailed"), StatusCode::BAD_GATEWAY);
//! ```

use crate::errors::ConfigError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Kind tag for requests without valid credentials
pub const KIND_UNAUTHORIZED: &str = "Unauthorized";

/// Kind tag for malformed requests
pub const KIND_BAD_REQUEST: &str = "BadRequest";

/// Kind tag for unexpected server failures
pub const KIND_INTERNAL: &str = "InternalError";

/// Map an error kind tag to an HTTP status code.
///
/// # Kind Mapping
///
/// | Kind | HTTP Code |
/// |------|-----------|
/// | `BadRequest`, `NilRoot`, `InvalidBackupId`, `InvalidZone` | 400 |
/// | `Unauthorized` | 401 |
/// | `SourceMissing`, `BackupMissing`, `ZoneNotFound` | 404 |
/// | `ZoneAlreadyExists`, `ZoneInInclude` | 409 |
/// | `ParseError`, `UnterminatedBlock`, `IncludeIOError`, `ValidationFailed` | 422 |
/// | `ReloadAfterWriteFailed`, `DaemonCommandFailed` | 502 |
/// | `DaemonTimeout` | 504 |
/// | `IOError`, `ExecLaunchError`, anything else | 500 |
#[must_use]
pub fn status_for_kind(kind: &str) -> StatusCode {
    match kind {
        KIND_BAD_REQUEST | "NilRoot" | "InvalidBackupId" | "InvalidZone" => {
            StatusCode::BAD_REQUEST
        }
        KIND_UNAUTHORIZED => StatusCode::UNAUTHORIZED,
        "SourceMissing" | "BackupMissing" | "ZoneNotFound" => StatusCode::NOT_FOUND,
        "ZoneAlreadyExists" | "ZoneInInclude" => StatusCode::CONFLICT,
        "ParseError" | "UnterminatedBlock" | "IncludeIOError" | "ValidationFailed" => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        "ReloadAfterWriteFailed" | "DaemonCommandFailed" => StatusCode::BAD_GATEWAY,
        "DaemonTimeout" => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,
    /// Stable kind tag
    pub kind: String,
}

/// Error returned by HTTP handlers.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// An error from the configuration manager
    Config(ConfigError),
    /// Missing or wrong bearer token
    Unauthorized,
    /// The request body or parameters are unusable
    BadRequest(String),
    /// Any other server-side failure
    Internal(String),
}

impl ApiError {
    /// Stable kind tag of this error.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(e) => e.kind(),
            Self::Unauthorized => KIND_UNAUTHORIZED,
            Self::BadRequest(_) => KIND_BAD_REQUEST,
            Self::Internal(_) => KIND_INTERNAL,
        }
    }

    /// HTTP status code of this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        status_for_kind(self.kind())
    }

    fn message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Unauthorized => "missing or invalid bearer token".to_string(),
            Self::BadRequest(msg) | Self::Internal(msg) => msg.clone(),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.message(),
            kind: self.kind().to_string(),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), kind = %body.kind, error = %body.error, "Request failed");
        } else {
            warn!(status = status.as_u16(), kind = %body.kind, error = %body.error, "Request rejected");
        }

        // A rejected candidate also returns the checker's verdict.
        if let Self::Config(ConfigError::ValidationRejected { result }) = &self {
            let payload = serde_json::json!({
                "error": body.error,
                "kind": body.kind,
                "validation": result,
            });
            return (status, Json(payload)).into_response();
        }

        (status, Json(body)).into_response()
    }
}
