// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access/refresh token issuance, verification and rotation.
//!
//! Access and refresh tokens are HS256 JWTs signed with distinct secrets and
//! carry a `kind` claim, so one can never stand in for the other.

use crate::db::{RepoError, UserRepository};
use crate::models::Role;
use crate::services::kv::{KvError, KvStore};
use crate::time_utils::unix_now;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Key prefix marking a refresh token ID as already exchanged.
const CONSUMED_REFRESH_PREFIX: &str = "refresh-consumed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub kind: TokenKind,
    /// Unique token ID
    pub jti: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Verification failure kinds. Only for internal branching and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is malformed")]
    Malformed,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// Rotation failures. Invalid tokens of every sort collapse into `Authentication`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("Invalid refresh token")]
    Authentication,

    #[error("Account is deactivated")]
    InactiveAccount,

    #[error(transparent)]
    Connectivity(KvError),

    #[error(transparent)]
    Repository(RepoError),
}

/// Secrets and lifetimes for both token kinds.
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// Issues and verifies token pairs.
#[derive(Clone)]
pub struct TokenService {
    access: Arc<SigningKeys>,
    refresh: Arc<SigningKeys>,
    revocation: Option<KvStore>,
}

impl TokenService {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            access: Arc::new(SigningKeys::new(
                &settings.access_secret,
                settings.access_ttl,
            )),
            refresh: Arc::new(SigningKeys::new(
                &settings.refresh_secret,
                settings.refresh_ttl,
            )),
            revocation: None,
        }
    }

    /// Make refresh tokens single-use, tracking exchanged IDs in `store`.
    pub fn with_revocation(mut self, store: KvStore) -> Self {
        self.revocation = Some(store);
        self
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => self.access.as_ref(),
            TokenKind::Refresh => self.refresh.as_ref(),
        }
    }

    /// Issue a fresh access/refresh pair for an account.
    pub fn issue_pair(&self, subject: Uuid, email: &str, role: Role) -> Result<TokenPair, TokenError> {
        self.issue_pair_at(subject, email, role, unix_now())
    }

    /// Issue a pair as if the current time were `issued_at` (Unix seconds).
    pub fn issue_pair_at(
        &self,
        subject: Uuid,
        email: &str,
        role: Role,
        issued_at: i64,
    ) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.sign(TokenKind::Access, subject, email, role, issued_at)?,
            refresh_token: self.sign(TokenKind::Refresh, subject, email, role, issued_at)?,
        })
    }

    fn sign(
        &self,
        kind: TokenKind,
        subject: Uuid,
        email: &str,
        role: Role,
        issued_at: i64,
    ) -> Result<String, TokenError> {
        let keys = self.keys(kind);
        let claims = Claims {
            sub: subject,
            email: email.to_string(),
            role,
            kind,
            jti: Uuid::new_v4(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_secs(keys.ttl)),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Refresh, token)
    }

    fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let claims = decode::<Claims>(token, &self.keys(kind).decoding, &validation)?.claims;

        // jsonwebtoken still accepts a token in its expiry second.
        if claims.exp <= unix_now() {
            return Err(TokenError::Expired);
        }

        // Only reachable if both secrets were configured identically.
        if claims.kind != kind {
            return Err(TokenError::InvalidSignature);
        }

        Ok(claims)
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// Role and active flag are re-read from `users`, so changes since the
    /// refresh token was issued apply immediately.
    pub async fn refresh_pair(
        &self,
        refresh_token: &str,
        users: &dyn UserRepository,
    ) -> Result<TokenPair, RefreshError> {
        let claims = self.verify_refresh(refresh_token).map_err(|e| {
            tracing::debug!(reason = %e, "Refresh token rejected");
            RefreshError::Authentication
        })?;

        let user = users
            .find_by_id(claims.sub)
            .await
            .map_err(RefreshError::Repository)?
            .ok_or_else(|| {
                tracing::debug!(subject = %claims.sub, "Refresh token for unknown account");
                RefreshError::Authentication
            })?;

        if !user.active {
            tracing::info!(subject = %user.id, "Refresh refused for deactivated account");
            return Err(RefreshError::InactiveAccount);
        }

        if let Some(store) = &self.revocation {
            let key = format!("{CONSUMED_REFRESH_PREFIX}:{}", claims.jti);
            let lifetime = Duration::from_secs((claims.exp - unix_now()).max(1) as u64);
            let first_use = store
                .set_if_absent(&key, &claims.sub.to_string(), lifetime)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Cannot record refresh token use, denying");
                    RefreshError::Connectivity(e)
                })?;

            if !first_use {
                tracing::warn!(subject = %user.id, jti = %claims.jti, "Refresh token replayed");
                return Err(RefreshError::Authentication);
            }
        }

        self.issue_pair(user.id, &user.email, user.role).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign rotated token pair");
            RefreshError::Authentication
        })
    }
}

/// Token lifetime in whole seconds, saturating at `i64::MAX`.
pub fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TokenSettings {
        TokenSettings {
            access_secret: b"access_secret_for_unit_tests!!".to_vec(),
            refresh_secret: b"refresh_secret_for_unit_tests!".to_vec(),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    #[test]
    fn test_claims_carry_identity_and_lifetimes() {
        let service = TokenService::new(&settings());
        let subject = Uuid::new_v4();
        let pair = service
            .issue_pair(subject, "a@example.com", Role::Admin)
            .unwrap();

        let access = service.verify_access(&pair.access_token).unwrap();
        let refresh = service.verify_refresh(&pair.refresh_token).unwrap();

        assert_eq!(access.sub, subject);
        assert_eq!(access.email, "a@example.com");
        assert_eq!(access.role, Role::Admin);
        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(access.exp - access.iat, 15 * 60);
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 60 * 60);
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn test_ttl_secs_saturates() {
        assert_eq!(ttl_secs(Duration::from_secs(900)), 900);
        assert_eq!(ttl_secs(Duration::from_secs(u64::MAX)), i64::MAX);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let service = TokenService::new(&settings());
        assert_eq!(service.verify_access("not-a-jwt"), Err(TokenError::Malformed));
        assert_eq!(service.verify_refresh(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_shared_secret_still_separates_kinds() {
        let mut same = settings();
        same.refresh_secret = same.access_secret.clone();
        let service = TokenService::new(&same);
        let pair = service
            .issue_pair(Uuid::new_v4(), "a@example.com", Role::User)
            .unwrap();

        assert_eq!(
            service.verify_access(&pair.refresh_token),
            Err(TokenError::InvalidSignature)
        );
    }
}
