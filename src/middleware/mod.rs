// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, rate limiting, security headers).

pub mod auth;
pub mod rate_limit;
pub mod security;

pub use auth::{authenticate, ensure_role, require_auth, AuthUser, GateError};
pub use rate_limit::{limit_auth_attempts, ClientIp};
