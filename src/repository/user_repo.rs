//! User repository (数据库访问层)

use super::UserStore;
use crate::{
    error::AppError,
    models::{OtpRecord, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estate_common::parse_roles;
use sqlx::PgPool;
use uuid::Uuid;

/// users 表的行结构
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    phone: String,
    roles: Vec<String>,
    otp_code: Option<String>,
    otp_expires_at: Option<DateTime<Utc>>,
    refresh_token_hash: Option<String>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let roles = parse_roles(&row.roles).map_err(|e| {
            tracing::error!(user_id = %row.id, "Stored role is invalid: {}", e);
            AppError::Internal(format!("invalid stored role: {}", e))
        })?;

        let otp = match (row.otp_code, row.otp_expires_at) {
            (Some(code), Some(expires_at)) => Some(OtpRecord { code, expires_at }),
            _ => None,
        };

        Ok(User {
            id: row.id,
            phone: row.phone,
            roles,
            otp,
            refresh_token_hash: row.refresh_token_hash,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    /// 根据手机号查找用户
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.db)
            .await?;

        row.map(User::try_from).transpose()
    }

    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(User::try_from).transpose()
    }

    /// 创建用户
    async fn insert(&self, user: &User) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (
                id, phone, roles, otp_code, otp_expires_at, refresh_token_hash,
                is_deleted, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.phone)
        .bind(user.role_names())
        .bind(user.otp.as_ref().map(|otp| otp.code.clone()))
        .bind(user.otp.as_ref().map(|otp| otp.expires_at))
        .bind(&user.refresh_token_hash)
        .bind(user.is_deleted)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.version)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Phone number already registered".to_string())
            }
            _ => AppError::Database(e),
        })?;

        User::try_from(row)
    }

    /// 更新用户（乐观锁）
    async fn update(&self, user: &User) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET
                roles = $3,
                otp_code = $4,
                otp_expires_at = $5,
                refresh_token_hash = $6,
                is_deleted = $7,
                updated_at = NOW(),
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(user.version)
        .bind(user.role_names())
        .bind(user.otp.as_ref().map(|otp| otp.code.clone()))
        .bind(user.otp.as_ref().map(|otp| otp.expires_at))
        .bind(&user.refresh_token_hash)
        .bind(user.is_deleted)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => User::try_from(row),
            None => match self.find_by_id(user.id).await? {
                Some(_) => Err(AppError::Conflict("User was modified concurrently".to_string())),
                None => Err(AppError::not_found("User not found")),
            },
        }
    }
}
