//! Credential record for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account role. Policy checks compare against these values directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored account. Never holds a plaintext password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable account ID
    pub id: Uuid,
    /// Unique login email (normalized to lowercase)
    pub email: String,
    /// bcrypt digest
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub full_name: Option<String>,
    /// Phone number as an encrypted field package
    pub phone_encrypted: Option<String>,
    pub role: Role,
    /// False once an admin deactivates the account
    pub active: bool,
    /// When the account was created (RFC3339)
    pub created_at: String,
}

/// Fields for creating an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_digest: String,
    pub full_name: Option<String>,
    pub phone_encrypted: Option<String>,
    pub role: Role,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub password_digest: Option<String>,
    pub active: Option<bool>,
    pub role: Option<Role>,
}

/// Profile returned to clients, with sensitive fields decrypted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
}
