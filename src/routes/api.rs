// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::{ensure_role, AuthUser};
use crate::models::{Role, UserProfile};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Roles allowed to manage other accounts.
const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];

/// API routes (require authentication via bearer token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/me", get(get_me))
        .route("/api/users/password", put(change_password))
        .route("/api/admin/users/{id}/deactivate", post(deactivate_user))
}

// ─── User Profile ────────────────────────────────────────────

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let profile = state.auth.profile(user.id).await?;
    Ok(Json(profile))
}

// ─── Password Change ─────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    state
        .auth
        .change_password(user.id, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Administration ──────────────────────────────────────────

async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(target): Path<Uuid>,
) -> Result<Json<UserProfile>> {
    ensure_role(&admin, ADMIN_ROLES)?;

    if target == admin.id {
        return Err(AppError::BadRequest(
            "cannot deactivate your own account".to_string(),
        ));
    }

    tracing::info!(admin_id = %admin.id, target = %target, "Deactivating account");
    let profile = state.auth.deactivate(target).await?;
    Ok(Json(profile))
}
