// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::AppError;
use crate::models::Role;
use crate::services::{TokenError, TokenService};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

const BEARER_PREFIX: &str = "Bearer ";

/// Authenticated caller identity, attached to request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }
}

/// Why a request could not be authenticated.
///
/// The wrapped `TokenError` is kept for logging only; clients see the same
/// response for every verification failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Token rejected: {0}")]
    Authentication(TokenError),
}

impl From<GateError> for AppError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::MissingToken => AppError::Unauthorized,
            GateError::Authentication(_) => AppError::InvalidToken,
        }
    }
}

/// Extract and verify the access token from an `Authorization` header.
pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> Result<AuthUser, GateError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(GateError::MissingToken)?;

    let claims = tokens
        .verify_access(token)
        .map_err(GateError::Authentication)?;

    Ok(AuthUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

/// Middleware that requires a valid access token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(request.headers(), state.auth.tokens()).map_err(|e| {
        tracing::debug!(reason = %e, path = %request.uri().path(), "Request not authenticated");
        AppError::from(e)
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Reject callers whose role is not in `allowed`.
pub fn ensure_role(user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if user.has_role(allowed) {
        Ok(())
    } else {
        tracing::warn!(user_id = %user.id, role = %user.role, "Role check failed");
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::http::HeaderValue;

    fn service() -> TokenService {
        TokenService::new(&Config::test_default().token_settings())
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            authenticate(&HeaderMap::new(), &service()),
            Err(GateError::MissingToken)
        );
    }

    #[test]
    fn test_wrong_scheme() {
        assert_eq!(
            authenticate(&headers_with("Basic dXNlcjpwYXNz"), &service()),
            Err(GateError::MissingToken)
        );
        assert_eq!(
            authenticate(&headers_with("Bearer "), &service()),
            Err(GateError::MissingToken)
        );
    }

    #[test]
    fn test_garbage_token() {
        assert_eq!(
            authenticate(&headers_with("Bearer nope"), &service()),
            Err(GateError::Authentication(TokenError::Malformed))
        );
    }

    #[test]
    fn test_refresh_token_is_not_accepted() {
        let tokens = service();
        let pair = tokens
            .issue_pair(Uuid::new_v4(), "a@example.com", Role::User)
            .unwrap();

        let result = authenticate(
            &headers_with(&format!("Bearer {}", pair.refresh_token)),
            &tokens,
        );
        assert!(matches!(result, Err(GateError::Authentication(_))));
    }

    #[test]
    fn test_valid_access_token() {
        let tokens = service();
        let id = Uuid::new_v4();
        let pair = tokens.issue_pair(id, "a@example.com", Role::Admin).unwrap();

        let user = authenticate(
            &headers_with(&format!("Bearer {}", pair.access_token)),
            &tokens,
        )
        .unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.email, "a@example.com");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn test_ensure_role() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            role: Role::User,
        };
        assert!(ensure_role(&user, &[Role::User]).is_ok());
        assert!(matches!(
            ensure_role(&user, &[Role::Admin, Role::SuperAdmin]),
            Err(AppError::Forbidden)
        ));
    }
}
