// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login and token refresh routes.

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::{limit_auth_attempts, ClientIp};
use crate::services::{AuthSession, Registration, TokenPair};
use crate::AppState;

/// Credential routes. Register and login are rate limited per client address.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let limited = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route_layer(middleware::from_fn_with_state(state, limit_auth_attempts));

    Router::new()
        .merge(limited)
        .route("/api/auth/refresh", post(refresh))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    email: String,
    password: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthSession>)> {
    let session = state
        .auth
        .register(Registration {
            email: body.email,
            password: body.password,
            full_name: body.full_name,
            phone: body.phone,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthSession>> {
    let session = state.auth.login(&body.email, &body.password).await?;

    // A successful login clears the failure budget for this address.
    if let Err(e) = state.rate_limiter.reset("login", &ip).await {
        tracing::warn!(error = %e, "Failed to reset login attempt counter");
    }

    Ok(Json(session))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    refresh_token: String,
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>> {
    let pair = state.auth.refresh(&body.refresh_token).await?;
    Ok(Json(pair))
}
