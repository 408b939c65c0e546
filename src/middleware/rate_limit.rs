// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client attempt limiting for credential endpoints.

use crate::error::AppError;
use crate::services::RateLimitDecision;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Address the request is attributed to for rate limiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

/// Resolve the caller's address: socket peer first, then `X-Forwarded-For`.
pub fn client_ip(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Count an attempt against the endpoint's action and reject the request
/// once the client is over its budget, or if the counter store is down.
pub async fn limit_auth_attempts(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    let action = request
        .uri()
        .path()
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("auth")
        .to_string();

    match state
        .rate_limiter
        .hit(&action, &ip, state.config.auth_rate_limit)
        .await
    {
        RateLimitDecision::Allowed { remaining } => {
            tracing::debug!(action = %action, ip = %ip, remaining, "Attempt allowed");
        }
        RateLimitDecision::Limited { retry_after } => {
            return Err(AppError::RateLimited { retry_after });
        }
        RateLimitDecision::Unavailable => {
            return Err(AppError::ServiceUnavailable(
                "rate limit store unreachable".to_string(),
            ));
        }
    }

    request.extensions_mut().insert(ClientIp(ip));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_client_ip_prefers_socket_peer() {
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 1, 2, 3], 4000))));

        assert_eq!(client_ip(&request), "10.1.2.3");
    }

    #[test]
    fn test_client_ip_from_forwarded_header() {
        let request = Request::builder()
            .header("x-forwarded-for", " 203.0.113.9 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), "203.0.113.9");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), "unknown");
    }
}
