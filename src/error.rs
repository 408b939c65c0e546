// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::db::RepoError;
use crate::services::{AuthError, StrengthViolation};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Account is deactivated")]
    InactiveAccount,

    #[error("Insufficient role")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Password too weak")]
    WeakPassword(Vec<StrengthViolation>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited { retry_after: Duration },

    #[error("Service temporarily unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut violations = Vec::new();
        let mut retry_after_secs = None;

        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::AuthenticationFailed => {
                (StatusCode::UNAUTHORIZED, "authentication_failed", None)
            }
            AppError::InactiveAccount => (StatusCode::FORBIDDEN, "inactive_account", None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::WeakPassword(list) => {
                violations = list.iter().map(ToString::to_string).collect();
                (StatusCode::BAD_REQUEST, "weak_password", None)
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::RateLimited { retry_after } => {
                retry_after_secs = Some(retry_after.as_secs().max(1));
                (StatusCode::TOO_MANY_REQUESTS, "rate_limited", None)
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!(error = %msg, "Dependency unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            violations,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Authentication => AppError::AuthenticationFailed,
            AuthError::InactiveAccount => AppError::InactiveAccount,
            AuthError::EmailTaken => AppError::Conflict("email already registered".to_string()),
            AuthError::WeakPassword(violations) => AppError::WeakPassword(violations),
            AuthError::Input(msg) => AppError::BadRequest(msg),
            AuthError::Connectivity(e) => AppError::ServiceUnavailable(e.to_string()),
            AuthError::Repository(e) => e.into(),
            AuthError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(what) => AppError::NotFound(what),
            RepoError::Conflict(what) => AppError::Conflict(what),
            RepoError::Backend(msg) => AppError::Database(msg),
        }
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
