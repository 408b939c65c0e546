// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod encryption;
pub mod kv;
pub mod password;
pub mod rate_limit;
pub mod tokens;

pub use auth::{AuthError, AuthService, AuthSession, Registration};
pub use encryption::{EncryptionError, EncryptionKey, FieldCipher};
pub use kv::{KvError, KvStore};
pub use password::{PasswordError, PasswordHasher, StrengthReport, StrengthViolation};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
pub use tokens::{Claims, RefreshError, TokenError, TokenKind, TokenPair, TokenService, TokenSettings};
