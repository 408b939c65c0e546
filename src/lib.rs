// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storefront credential protection and session tokens.
//!
//! This crate provides field encryption, password hashing, access/refresh
//! tokens, the bearer token gate and store-backed rate limiting, plus the
//! account API built on top of them.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::UserRepository;
use services::{AuthService, FieldCipher, KvStore, PasswordHasher, RateLimiter, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserRepository>,
    pub auth: AuthService,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wire services together from validated configuration.
    ///
    /// `kv` backs both rate limiting and single-use refresh tokens.
    pub fn new(config: Config, users: Arc<dyn UserRepository>, kv: KvStore) -> Self {
        let tokens = TokenService::new(&config.token_settings()).with_revocation(kv.clone());
        let auth = AuthService::new(
            users.clone(),
            tokens,
            PasswordHasher::new(config.hash_workers),
            FieldCipher::new(config.encryption_key.clone()),
        );

        Self {
            config,
            users,
            auth,
            rate_limiter: RateLimiter::new(kv),
        }
    }
}
