// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ApiError`: the single place that maps internal error kinds onto the
//! admin API's stable `(StatusCode, code)` contract (SPEC_FULL §4.12/§7).
//! Handlers never hand-roll their own status/code mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use px_core::ErrorCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Thin wrapper translating `px_core::Error` and `px_config::ConfigError`
/// into the admin API's JSON error envelope.
#[derive(Debug)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::ProcessNotFound | ErrorCode::ConfigNotFound | ErrorCode::ProxyNotEnabled => StatusCode::NOT_FOUND,
            ErrorCode::ProcessAlreadyRunning
            | ErrorCode::ProcessNotRunning
            | ErrorCode::InvalidPattern
            | ErrorCode::InvalidConfig
            | ErrorCode::StreamingNotSupported => StatusCode::BAD_REQUEST,
            ErrorCode::ShutdownInProgress => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::StartFailed | ErrorCode::TransportFailure => StatusCode::BAD_GATEWAY,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<px_core::Error> for ApiError {
    fn from(err: px_core::Error) -> Self {
        Self { code: err.code(), message: err.to_string() }
    }
}

impl From<px_config::ConfigError> for ApiError {
    fn from(err: px_config::ConfigError) -> Self {
        Self { code: err.code(), message: err.to_string() }
    }
}

/// A malformed request body never panics the handler (SPEC_FULL §7): the
/// spec's error-code list is closed, so extractor rejections map to
/// `internal` with a 400 rather than inventing a new code.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self { code: ErrorCode::Internal, message: rejection.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { code: self.code.as_str(), message: self.message })).into_response()
    }
}
