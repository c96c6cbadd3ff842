//! In-memory user store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::UserStore;
use crate::{error::AppError, models::User};

/// In-memory user store, used when no database is configured and in tests
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
    phones: RwLock<HashMap<String, Uuid>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            phones: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored accounts
    pub fn account_count(&self) -> usize {
        self.users.read().map(|users| users.len()).unwrap_or(0)
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> AppError {
    AppError::internal_error("user store lock poisoned")
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, AppError> {
        let id = match self.phones.read().map_err(|_| poisoned())?.get(phone) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().map_err(|_| poisoned())?.get(&id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<User, AppError> {
        // Lock order: phones, then users
        let mut phones = self.phones.write().map_err(|_| poisoned())?;
        if phones.contains_key(&user.phone) {
            return Err(AppError::Conflict("Phone number already registered".to_string()));
        }

        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.contains_key(&user.id) {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        phones.insert(user.phone.clone(), user.id);
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if stored.version != user.version {
            return Err(AppError::Conflict("User was modified concurrently".to_string()));
        }

        let mut next = user.clone();
        next.phone = stored.phone.clone();
        next.created_at = stored.created_at;
        next.updated_at = Utc::now();
        next.version = stored.version + 1;
        *stored = next.clone();

        Ok(next)
    }
}
