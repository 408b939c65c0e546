// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod proxy;
pub mod user;

pub use proxy::{open_proxy_secrets, seal_proxy_secrets, ProxySecrets, SealedProxySecrets};
pub use user::{NewUser, Role, User, UserProfile, UserUpdate};
