//! Application configuration loaded from environment variables.
//!
//! Secrets and keys are read and validated once at startup, then passed
//! explicitly to the services that use them.

use crate::services::encryption::EncryptionKey;
use crate::services::rate_limit::RateLimitPolicy;
use crate::services::tokens::TokenSettings;
use crate::time_utils::{parse_duration, unix_now};
use std::env;
use std::time::Duration;

const DEFAULT_ACCESS_EXPIRY: &str = "15m";
const DEFAULT_REFRESH_EXPIRY: &str = "7d";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Key-value store connection URL
    pub redis_url: String,
    /// Per-command deadline for the key-value store
    pub kv_timeout: Duration,
    /// Login/registration attempts allowed per client per window
    pub auth_rate_limit: RateLimitPolicy,
    /// Maximum concurrent password hashing jobs
    pub hash_workers: usize,
    /// Access token lifetime
    pub jwt_access_expiry: Duration,
    /// Refresh token lifetime (strictly longer than access)
    pub jwt_refresh_expiry: Duration,

    // --- Secrets ---
    /// Field encryption key (validated 32 bytes)
    pub encryption_key: EncryptionKey,
    /// Access token signing secret (raw bytes)
    pub jwt_access_secret: Vec<u8>,
    /// Refresh token signing secret (raw bytes, differs from access)
    pub jwt_refresh_secret: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            port: 3001,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            kv_timeout: Duration::from_millis(500),
            auth_rate_limit: RateLimitPolicy::default(),
            hash_workers: 2,
            jwt_access_expiry: Duration::from_secs(15 * 60),
            jwt_refresh_expiry: Duration::from_secs(7 * 24 * 60 * 60),
            encryption_key: EncryptionKey::from_bytes([7u8; 32]),
            jwt_access_secret: b"test_access_secret_32_bytes_min!".to_vec(),
            jwt_refresh_secret: b"test_refresh_secret_32_bytes_mn!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let encryption_key = EncryptionKey::from_hex(&required("ENCRYPTION_KEY")?).map_err(|_| {
            ConfigError::Invalid {
                var: "ENCRYPTION_KEY",
                reason: "must be 64 hex characters (32 bytes)".to_string(),
            }
        })?;

        let jwt_access_secret = required("JWT_ACCESS_SECRET")?.into_bytes();
        let jwt_refresh_secret = required("JWT_REFRESH_SECRET")?.into_bytes();

        let config = Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string()),
            port: parse_var("PORT", 3001)?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            kv_timeout: Duration::from_millis(parse_var("KV_TIMEOUT_MS", 500u64)?),
            auth_rate_limit: RateLimitPolicy {
                max_attempts: parse_var("LOGIN_RATE_LIMIT_MAX", 5u32)?,
                window: duration_var("LOGIN_RATE_LIMIT_WINDOW", "15m")?,
            },
            hash_workers: parse_var(
                "HASH_WORKERS",
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4),
            )?,
            jwt_access_expiry: duration_var("JWT_ACCESS_EXPIRY", DEFAULT_ACCESS_EXPIRY)?,
            jwt_refresh_expiry: duration_var("JWT_REFRESH_EXPIRY", DEFAULT_REFRESH_EXPIRY)?,
            encryption_key,
            jwt_access_secret,
            jwt_refresh_secret,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_access_secret == self.jwt_refresh_secret {
            return Err(ConfigError::Invalid {
                var: "JWT_REFRESH_SECRET",
                reason: "must differ from JWT_ACCESS_SECRET".to_string(),
            });
        }
        if self.jwt_access_expiry >= self.jwt_refresh_expiry {
            return Err(ConfigError::Invalid {
                var: "JWT_REFRESH_EXPIRY",
                reason: "must be longer than JWT_ACCESS_EXPIRY".to_string(),
            });
        }
        for (var, expiry) in [
            ("JWT_ACCESS_EXPIRY", self.jwt_access_expiry),
            ("JWT_REFRESH_EXPIRY", self.jwt_refresh_expiry),
        ] {
            let expires_at = i64::try_from(expiry.as_secs())
                .ok()
                .and_then(|secs| unix_now().checked_add(secs));
            if expires_at.is_none() {
                return Err(ConfigError::Invalid {
                    var,
                    reason: "duration is too large".to_string(),
                });
            }
        }
        if self.kv_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "KV_TIMEOUT_MS",
                reason: "must be positive".to_string(),
            });
        }
        if self.auth_rate_limit.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "LOGIN_RATE_LIMIT_MAX",
                reason: "must be positive".to_string(),
            });
        }
        if self.hash_workers == 0 {
            return Err(ConfigError::Invalid {
                var: "HASH_WORKERS",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Token secrets and lifetimes.
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            access_secret: self.jwt_access_secret.clone(),
            refresh_secret: self.jwt_refresh_secret.clone(),
            access_ttl: self.jwt_access_expiry,
            refresh_ttl: self.jwt_refresh_expiry,
        }
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    let value = env::var(var).map_err(|_| ConfigError::Missing(var))?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::Missing(var));
    }
    Ok(value)
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            reason: format!("cannot parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

fn duration_var(var: &'static str, default: &str) -> Result<Duration, ConfigError> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    parse_duration(&raw).ok_or_else(|| ConfigError::Invalid {
        var,
        reason: format!("expected a duration like 15m or 7d, got {raw:?}"),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var(
            "ENCRYPTION_KEY",
            "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
        );
        env::set_var("JWT_ACCESS_SECRET", "test_access_secret");
        env::set_var("JWT_REFRESH_SECRET", "test_refresh_secret");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_access_expiry, Duration::from_secs(900));
        assert_eq!(config.jwt_refresh_expiry, Duration::from_secs(604_800));
        assert_eq!(config.jwt_access_secret, b"test_access_secret");
    }

    #[test]
    fn test_test_default_is_valid() {
        Config::test_default().validate().expect("test config should be valid");
    }

    #[test]
    fn test_rejects_shared_secrets() {
        let mut config = Config::test_default();
        config.jwt_refresh_secret = config.jwt_access_secret.clone();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                var: "JWT_REFRESH_SECRET",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_expiry_beyond_unix_range() {
        let mut config = Config::test_default();
        config.jwt_refresh_expiry =
            parse_duration("106751991167300d").expect("parses as a duration");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                var: "JWT_REFRESH_EXPIRY",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_access_outliving_refresh() {
        let mut config = Config::test_default();
        config.jwt_access_expiry = config.jwt_refresh_expiry;
        assert!(config.validate().is_err());
    }
}
