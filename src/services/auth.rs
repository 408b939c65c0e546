// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account workflow: registration, login, token refresh, password change
//! and deactivation.

use crate::db::{RepoError, UserRepository};
use crate::models::{NewUser, Role, User, UserProfile, UserUpdate};
use crate::services::encryption::{EncryptionError, FieldCipher};
use crate::services::kv::KvError;
use crate::services::password::{self, PasswordError, PasswordHasher, StrengthViolation};
use crate::services::tokens::{RefreshError, TokenPair, TokenService};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Unknown email, wrong password or invalid token.
    #[error("Invalid credentials")]
    Authentication,

    #[error("Account is deactivated")]
    InactiveAccount,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Password does not meet strength requirements")]
    WeakPassword(Vec<StrengthViolation>),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error(transparent)]
    Connectivity(KvError),

    #[error(transparent)]
    Repository(RepoError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AuthError {
    fn from(e: RepoError) -> Self {
        AuthError::Repository(e)
    }
}

impl From<RefreshError> for AuthError {
    fn from(e: RefreshError) -> Self {
        match e {
            RefreshError::Authentication => AuthError::Authentication,
            RefreshError::InactiveAccount => AuthError::InactiveAccount,
            RefreshError::Connectivity(e) => AuthError::Connectivity(e),
            RefreshError::Repository(e) => AuthError::Repository(e),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Input => AuthError::Input("password must not be empty".to_string()),
            PasswordError::Hashing(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<EncryptionError> for AuthError {
    fn from(e: EncryptionError) -> Self {
        AuthError::Internal(e.to_string())
    }
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

/// Successful login/registration result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    hasher: PasswordHasher,
    cipher: FieldCipher,
    decoy: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: TokenService,
        hasher: PasswordHasher,
        cipher: FieldCipher,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            cipher,
            decoy: Arc::new(OnceCell::new()),
        }
    }

    async fn decoy_digest(&self) -> Result<String, AuthError> {
        let digest = self
            .decoy
            .get_or_try_init(|| self.hasher.hash(crate::services::encryption::generate_key()))
            .await?;
        Ok(digest.clone())
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub async fn register(&self, registration: Registration) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&registration.email)?;

        let report = password::check_strength(&registration.password);
        if !report.is_valid {
            return Err(AuthError::WeakPassword(report.violations));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_digest = self.hasher.hash(registration.password).await?;
        let phone_encrypted = match registration.phone.as_deref().map(str::trim) {
            Some(phone) if !phone.is_empty() => Some(self.cipher.encrypt(phone)?),
            _ => None,
        };

        let user = self
            .users
            .create(NewUser {
                email,
                password_digest,
                full_name: registration.full_name,
                phone_encrypted,
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                RepoError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Account registered");
        self.session_for(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::Authentication)?;

        let Some(user) = self.users.find_by_email(&email).await? else {
            // Unknown emails cost one bcrypt verify, same as a real account.
            let decoy = self.decoy_digest().await?;
            self.hasher.verify(password.to_string(), decoy).await;
            return Err(AuthError::Authentication);
        };

        if !self
            .hasher
            .verify(password.to_string(), user.password_digest.clone())
            .await
        {
            tracing::debug!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(AuthError::Authentication);
        }

        if !user.active {
            return Err(AuthError::InactiveAccount);
        }

        tracing::info!(user_id = %user.id, "Login succeeded");
        self.session_for(&user)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        Ok(self
            .tokens
            .refresh_pair(refresh_token, self.users.as_ref())
            .await?)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::Repository(RepoError::NotFound(user_id.to_string())))?;
        self.to_profile(&user)
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::Authentication)?;

        if !self
            .hasher
            .verify(current_password.to_string(), user.password_digest.clone())
            .await
        {
            return Err(AuthError::Authentication);
        }

        let report = password::check_strength(new_password);
        if !report.is_valid {
            return Err(AuthError::WeakPassword(report.violations));
        }

        let password_digest = self.hasher.hash(new_password.to_string()).await?;
        self.users
            .update(
                user_id,
                UserUpdate {
                    password_digest: Some(password_digest),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    pub async fn deactivate(&self, user_id: Uuid) -> Result<UserProfile, AuthError> {
        let user = self
            .users
            .update(
                user_id,
                UserUpdate {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, "Account deactivated");
        self.to_profile(&user)
    }

    fn session_for(&self, user: &User) -> Result<AuthSession, AuthError> {
        let tokens = self
            .tokens
            .issue_pair(user.id, &user.email, user.role)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(AuthSession {
            user: self.to_profile(user)?,
            tokens,
        })
    }

    fn to_profile(&self, user: &User) -> Result<UserProfile, AuthError> {
        let phone = user
            .phone_encrypted
            .as_deref()
            .map(|v| self.cipher.decrypt_or_legacy(v))
            .transpose()?;

        Ok(UserProfile {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            phone,
            role: user.role,
            is_active: user.active,
            created_at: user.created_at.clone(),
        })
    }
}

/// Trim and lowercase an email, rejecting obviously malformed values.
fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::Input("invalid email address".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM ").unwrap(), "alice@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@localhost").is_err());
        assert!(normalize_email("a b@example.com").is_err());
        assert!(normalize_email("a@b@example.com").is_err());
    }
}
