// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared TTL key-value store (Redis).
//!
//! One auto-reconnecting connection manager is created at startup and cloned
//! into the services that need it. Every command is bounded by a timeout;
//! an unreachable or slow store surfaces as [`KvError::Connectivity`].

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use std::future::Future;
use std::time::Duration;

/// Attempts made by read-only retrying calls.
const READ_ATTEMPTS: u32 = 3;
const READ_BACKOFF: Duration = Duration::from_millis(50);

/// Increment a counter and start its TTL on the first hit, in one round-trip.
const INCR_WINDOW_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KvError {
    #[error("Key-value store unreachable: {0}")]
    Connectivity(String),

    #[error("Key-value store command failed: {0}")]
    Command(String),
}

impl KvError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, KvError::Connectivity(_))
    }
}

impl From<redis::RedisError> for KvError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
        {
            KvError::Connectivity(e.to_string())
        } else {
            KvError::Command(e.to_string())
        }
    }
}

/// Handle to the shared key-value store.
#[derive(Clone)]
pub struct KvStore {
    conn: Option<ConnectionManager>,
    timeout: Duration,
}

impl KvStore {
    /// Connect to the store at `url`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, KvError> {
        let client = redis::Client::open(url).map_err(KvError::from)?;
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| KvError::Connectivity(format!("connect to {url} timed out")))?
            .map_err(KvError::from)?;

        tracing::info!("Connected to key-value store");

        Ok(Self {
            conn: Some(conn),
            timeout,
        })
    }

    /// Create a store handle with no connection (offline mode).
    ///
    /// All operations fail with [`KvError::Connectivity`].
    pub fn new_offline() -> Self {
        Self {
            conn: None,
            timeout: Duration::from_millis(1),
        }
    }

    fn connection(&self) -> Result<ConnectionManager, KvError> {
        self.conn
            .clone()
            .ok_or_else(|| KvError::Connectivity("store not connected (offline mode)".to_string()))
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T, KvError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                tracing::debug!(op, error = %e, "Key-value command failed");
                KvError::from(e)
            }),
            Err(_) => Err(KvError::Connectivity(format!("{op} timed out"))),
        }
    }

    /// Store a value, optionally expiring after `ttl` (whole seconds, minimum 1).
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError> {
        let mut conn = self.connection()?;
        match ttl {
            Some(ttl) => {
                self.run("set_ex", conn.set_ex(key, value, ttl_secs(ttl)))
                    .await
            }
            None => self.run("set", conn.set(key, value)).await,
        }
    }

    /// Store a value only if the key is absent. Returns whether it was stored.
    pub async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX").arg("EX").arg(ttl_secs(ttl));
        let reply: Option<String> = self.run("set_nx", cmd.query_async(&mut conn)).await?;
        Ok(reply.is_some())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.connection()?;
        self.run("get", conn.get(key)).await
    }

    /// [`KvStore::get`] with bounded retries on connectivity failures.
    pub async fn get_with_retry(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut backoff = READ_BACKOFF;
        let mut attempt = 1;
        loop {
            match self.get(key).await {
                Err(e) if e.is_connectivity() && attempt < READ_ATTEMPTS => {
                    tracing::debug!(attempt, error = %e, "Retrying key-value read");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut conn = self.connection()?;
        let _removed: i64 = self.run("del", conn.del(key)).await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let mut conn = self.connection()?;
        self.run("exists", conn.exists(key)).await
    }

    /// Atomically increment a counter, creating it at 1.
    pub async fn increment(&self, key: &str) -> Result<i64, KvError> {
        let mut conn = self.connection()?;
        self.run("incr", conn.incr(key, 1i64)).await
    }

    /// Atomically increment a counter; the first increment starts a `window` TTL.
    pub async fn increment_in_window(&self, key: &str, window: Duration) -> Result<i64, KvError> {
        let mut conn = self.connection()?;
        let script = redis::Script::new(INCR_WINDOW_SCRIPT);
        let mut invocation = script.key(key);
        invocation.arg(ttl_secs(window));
        self.run("incr_window", invocation.invoke_async(&mut conn))
            .await
    }

    pub async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<(), KvError> {
        let mut conn = self.connection()?;
        let _applied: bool = self.run("expire", conn.expire(key, ttl_seconds)).await?;
        Ok(())
    }

    /// Seconds until `key` expires: `-1` if it has no TTL, `-2` if it is absent.
    pub async fn remaining_ttl(&self, key: &str) -> Result<i64, KvError> {
        let mut conn = self.connection()?;
        self.run("ttl", conn.ttl(key)).await
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_store_reports_connectivity() {
        let store = KvStore::new_offline();
        let err = store.increment("rate-limit:login:1.2.3.4").await.unwrap_err();
        assert!(err.is_connectivity());
        assert!(store.get_with_retry("missing").await.unwrap_err().is_connectivity());
    }

    #[test]
    fn test_ttl_rounds_up_to_one_second() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(900)), 900);
    }
}
