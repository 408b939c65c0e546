// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Response;
use std::sync::Arc;
use std::time::Duration;
use storefront_auth::config::Config;
use storefront_auth::db::{MemoryUserStore, UserRepository};
use storefront_auth::routes::create_router;
use storefront_auth::services::{
    AuthService, FieldCipher, KvStore, PasswordHasher, TokenService,
};
use storefront_auth::AppState;

/// Check if a key-value store is available via environment variable.
#[allow(dead_code)]
pub fn redis_available() -> bool {
    std::env::var("REDIS_URL").is_ok()
}

/// Skip test with message if no key-value store is available.
#[macro_export]
macro_rules! require_redis {
    () => {
        if !crate::common::redis_available() {
            eprintln!("⚠️  Skipping: REDIS_URL not set");
            return;
        }
    };
}

/// Connect to the store named by `REDIS_URL`.
#[allow(dead_code)]
pub async fn test_kv() -> KvStore {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL not set");
    KvStore::connect(&url, Duration::from_secs(2))
        .await
        .expect("Failed to connect to key-value store")
}

/// Create a test app with an offline key-value store and in-memory users.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_kv(KvStore::new_offline())
}

#[allow(dead_code)]
pub fn create_test_app_with_kv(kv: KvStore) -> (axum::Router, Arc<AppState>) {
    let users = Arc::new(MemoryUserStore::new());
    let state = Arc::new(AppState::new(Config::test_default(), users, kv));
    (create_router(state.clone()), state)
}

/// Auth service without refresh-token revocation, so rotation works offline.
#[allow(dead_code)]
pub fn test_auth_service() -> (AuthService, Arc<MemoryUserStore>) {
    let config = Config::test_default();
    let users = Arc::new(MemoryUserStore::new());
    let repo: Arc<dyn UserRepository> = users.clone();
    let auth = AuthService::new(
        repo,
        TokenService::new(&config.token_settings()),
        PasswordHasher::new(2),
        FieldCipher::new(config.encryption_key.clone()),
    );
    (auth, users)
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
