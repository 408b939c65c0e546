// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed-window rate limiting backed by the shared key-value store.
//!
//! Counters live in the external store so limits hold across instances.
//! If the store cannot be reached the limiter fails closed.

use crate::services::kv::{KvError, KvStore};
use std::time::Duration;

/// Build the counter key for an action performed by an actor (IP or user ID).
pub fn rate_limit_key(action: &str, identifier: &str) -> String {
    format!("rate-limit:{action}:{identifier}")
}

/// Attempts allowed per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
    /// The store could not be consulted; the action is denied.
    Unavailable,
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: KvStore,
}

impl RateLimiter {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Count one attempt and decide whether it may proceed.
    pub async fn hit(
        &self,
        action: &str,
        identifier: &str,
        policy: RateLimitPolicy,
    ) -> RateLimitDecision {
        let key = rate_limit_key(action, identifier);

        let count = match self.store.increment_in_window(&key, policy.window).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(action, error = %e, "Rate limit store unavailable, denying");
                return RateLimitDecision::Unavailable;
            }
        };

        self.decide(&key, action, count, policy).await
    }

    /// Check the current count without recording an attempt.
    pub async fn peek(
        &self,
        action: &str,
        identifier: &str,
        policy: RateLimitPolicy,
    ) -> RateLimitDecision {
        let key = rate_limit_key(action, identifier);

        let count = match self.store.get_with_retry(&key).await {
            Ok(value) => value.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0),
            Err(e) => {
                tracing::error!(action, error = %e, "Rate limit store unavailable, denying");
                return RateLimitDecision::Unavailable;
            }
        };

        if count < i64::from(policy.max_attempts) {
            RateLimitDecision::Allowed {
                remaining: remaining(count, policy),
            }
        } else {
            self.limited(&key, policy).await
        }
    }

    /// Forget all attempts for an actor, e.g. after a successful login.
    pub async fn reset(&self, action: &str, identifier: &str) -> Result<(), KvError> {
        self.store.delete(&rate_limit_key(action, identifier)).await
    }

    async fn decide(
        &self,
        key: &str,
        action: &str,
        count: i64,
        policy: RateLimitPolicy,
    ) -> RateLimitDecision {
        if count <= i64::from(policy.max_attempts) {
            return RateLimitDecision::Allowed {
                remaining: remaining(count, policy),
            };
        }

        tracing::warn!(action, count, "Rate limit exceeded");
        self.limited(key, policy).await
    }

    async fn limited(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        // Fall back to the full window if the TTL cannot be read.
        let retry_after = match self.store.remaining_ttl(key).await {
            Ok(secs) if secs > 0 => Duration::from_secs(secs as u64),
            _ => policy.window,
        };
        RateLimitDecision::Limited { retry_after }
    }
}

fn remaining(count: i64, policy: RateLimitPolicy) -> u32 {
    let left = i64::from(policy.max_attempts) - count;
    left.clamp(0, i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key_is_scoped_by_action_and_actor() {
        assert_eq!(rate_limit_key("login", "10.0.0.1"), "rate-limit:login:10.0.0.1");
        assert_ne!(
            rate_limit_key("login", "10.0.0.1"),
            rate_limit_key("register", "10.0.0.1")
        );
        assert_ne!(
            rate_limit_key("login", "10.0.0.1"),
            rate_limit_key("login", "10.0.0.2")
        );
    }

    #[test]
    fn test_remaining_saturates() {
        let policy = RateLimitPolicy {
            max_attempts: 3,
            window: Duration::from_secs(60),
        };
        assert_eq!(remaining(1, policy), 2);
        assert_eq!(remaining(3, policy), 0);
        assert_eq!(remaining(10, policy), 0);
    }

    #[tokio::test]
    async fn test_offline_store_fails_closed() {
        let limiter = RateLimiter::new(KvStore::new_offline());
        let policy = RateLimitPolicy::default();

        assert_eq!(
            limiter.hit("login", "10.0.0.1", policy).await,
            RateLimitDecision::Unavailable
        );
        assert_eq!(
            limiter.peek("login", "10.0.0.1", policy).await,
            RateLimitDecision::Unavailable
        );
    }
}
