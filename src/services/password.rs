// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing, verification and strength rules.

use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// bcrypt work factor.
pub const HASH_COST: u32 = 12;

/// Punctuation accepted as a "special character".
pub const SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

pub const MIN_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("Password must not be empty")]
    Input,

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Hash a password with bcrypt at [`HASH_COST`]. The salt is embedded in the digest.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Input);
    }
    bcrypt::hash(password, HASH_COST).map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Check a password against a stored digest.
///
/// Never errors: empty inputs and unparseable digests are simply a mismatch.
pub fn verify(password: &str, digest: &str) -> bool {
    if password.is_empty() || digest.is_empty() {
        return false;
    }
    match bcrypt::verify(password, digest) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password digest could not be parsed");
            false
        }
    }
}

/// A single failed strength rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthViolation {
    TooShort,
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSymbol,
}

impl fmt::Display for StrengthViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::TooShort => "Password must be at least 8 characters long",
            Self::MissingUppercase => "Password must contain at least one uppercase letter",
            Self::MissingLowercase => "Password must contain at least one lowercase letter",
            Self::MissingDigit => "Password must contain at least one number",
            Self::MissingSymbol => "Password must contain at least one special character",
        };
        f.write_str(msg)
    }
}

/// Outcome of [`check_strength`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthReport {
    pub is_valid: bool,
    pub violations: Vec<StrengthViolation>,
}

/// Evaluate every strength rule and report all that fail.
pub fn check_strength(password: &str) -> StrengthReport {
    let rules: [(bool, StrengthViolation); 5] = [
        (
            password.chars().count() >= MIN_LENGTH,
            StrengthViolation::TooShort,
        ),
        (
            password.chars().any(|c| c.is_ascii_uppercase()),
            StrengthViolation::MissingUppercase,
        ),
        (
            password.chars().any(|c| c.is_ascii_lowercase()),
            StrengthViolation::MissingLowercase,
        ),
        (
            password.chars().any(|c| c.is_ascii_digit()),
            StrengthViolation::MissingDigit,
        ),
        (
            password.chars().any(|c| SYMBOLS.contains(c)),
            StrengthViolation::MissingSymbol,
        ),
    ];

    let violations: Vec<StrengthViolation> = rules
        .into_iter()
        .filter(|(passed, _)| !passed)
        .map(|(_, violation)| violation)
        .collect();

    StrengthReport {
        is_valid: violations.is_empty(),
        violations,
    }
}

/// Runs bcrypt on the blocking pool with a cap on concurrent jobs.
#[derive(Clone)]
pub struct PasswordHasher {
    permits: Arc<Semaphore>,
}

impl PasswordHasher {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub async fn hash(&self, password: String) -> Result<String, PasswordError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;

        tokio::task::spawn_blocking(move || hash(&password))
            .await
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
    }

    pub async fn verify(&self, password: String, digest: String) -> bool {
        let Ok(_permit) = self.permits.acquire().await else {
            return false;
        };

        match tokio::task::spawn_blocking(move || verify(&password, &digest)).await {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(workers)
    }
}
