// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process user store for local development and tests.

use super::{RepoError, UserRepository};
use crate::models::{NewUser, User, UserUpdate};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Users keyed by ID, with a unique email index.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<DashMap<Uuid, User>>,
    email_index: Arc<DashMap<String, Uuid>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let Some(id) = self.email_index.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepoError> {
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_digest: new_user.password_digest,
            full_name: new_user.full_name,
            phone_encrypted: new_user.phone_encrypted,
            role: new_user.role,
            active: true,
            created_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        // Reserve the email first so concurrent registrations cannot both win.
        match self.email_index.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(RepoError::Conflict(user.email)),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserUpdate) -> Result<User, RepoError> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        let user = entry.value_mut();

        if let Some(digest) = changes.password_digest {
            user.password_digest = digest;
        }
        if let Some(active) = changes.active {
            user.active = active;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }

        Ok(user.clone())
    }
}
