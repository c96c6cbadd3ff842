//! User domain models

use chrono::{DateTime, Duration, Utc};
use estate_common::{Role, UserProfile, UserView};
use uuid::Uuid;

/// One-time passcode attached to a user record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn issue(code: String, ttl: Duration) -> Self {
        Self {
            code,
            expires_at: Utc::now() + ttl,
        }
    }

    /// Expired strictly after `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// User account, keyed by phone number
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    pub roles: Vec<Role>,

    // Login state
    pub otp: Option<OtpRecord>,
    /// SHA-256 of the single active refresh token
    pub refresh_token_hash: Option<String>,
    pub is_deleted: bool,

    // Metadata
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Optimistic-lock counter, bumped by every store update
    pub version: i64,
}

impl User {
    pub fn new(phone: &str, roles: Vec<Role>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            roles,
            otp: None,
            refresh_token_hash: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            phone: self.phone.clone(),
            role: self.roles.clone(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            phone: self.phone.clone(),
            role: self.roles.clone(),
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }
}
