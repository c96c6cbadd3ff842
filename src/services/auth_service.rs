//! 认证服务：发送验证码、验证码登录、令牌刷新、账户注销

use crate::{
    auth::{
        jwt::{JwtService, TokenError},
        otp::{hash_token, normalize_phone, token_matches_hash, OtpGenerator},
    },
    config::AppConfig,
    error::AppError,
    models::{auth::*, OtpRecord, User},
    repository::UserStore,
    services::otp_sender::OtpSender,
};
use chrono::{Duration, Utc};
use estate_common::{parse_roles, ProfileResponse};
use std::sync::Arc;
use uuid::Uuid;

/// 并发写冲突时重新读取并重试的次数
const MAX_WRITE_ATTEMPTS: usize = 3;

const INVALID_REQUEST: &str = "Invalid request";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_service: Arc<JwtService>,
    otp_sender: Arc<dyn OtpSender>,
    otp_ttl: Duration,
    otp_length: u32,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        jwt_service: Arc<JwtService>,
        otp_sender: Arc<dyn OtpSender>,
        config: &AppConfig,
    ) -> Self {
        Self {
            users,
            jwt_service,
            otp_sender,
            otp_ttl: Duration::seconds(config.otp.ttl_secs as i64),
            otp_length: config.otp.code_length,
        }
    }

    /// 发送验证码
    ///
    /// 新手机号创建账户，已有账户复用（已软删除的会被重新激活）。
    /// 无论哪种情况响应都相同，不暴露手机号是否已注册。
    pub async fn send_otp(&self, req: SendOtpRequest) -> Result<MessageResponse, AppError> {
        if req.phone.trim().is_empty() || req.role.is_empty() {
            return Err(AppError::validation("Phone & role required"));
        }

        let phone = normalize_phone(&req.phone)?;
        let roles = parse_roles(&req.role).map_err(|e| AppError::Validation(e.to_string()))?;

        let code = OtpGenerator::generate(self.otp_length);

        let mut attempt = 0;
        let user = loop {
            attempt += 1;

            let mut user = match self.users.find_by_phone(&phone).await? {
                Some(user) => user,
                None => match self.users.insert(&User::new(&phone, roles.clone())).await {
                    Ok(user) => {
                        tracing::info!(user_id = %user.id, "Account created on first OTP request");
                        user
                    }
                    // 同一手机号并发创建，读取胜出者的记录
                    Err(AppError::Conflict(_)) if attempt < MAX_WRITE_ATTEMPTS => continue,
                    Err(e) => return Err(e),
                },
            };

            if user.is_deleted {
                tracing::info!(user_id = %user.id, "Reactivating soft-deleted account");
                user.is_deleted = false;
            }
            user.otp = Some(OtpRecord::issue(code.clone(), self.otp_ttl));

            match self.users.update(&user).await {
                Ok(saved) => break saved,
                Err(AppError::Conflict(_)) if attempt < MAX_WRITE_ATTEMPTS => continue,
                Err(e) => return Err(e),
            }
        };

        self.otp_sender.send(&user.phone, &code).await?;

        Ok(MessageResponse::ok("OTP sent successfully"))
    }

    /// 校验验证码并登录
    ///
    /// 成功后清除验证码、签发新令牌对，并覆盖用户当前的刷新令牌（其他会话随之失效）
    pub async fn verify_otp(&self, req: VerifyOtpRequest) -> Result<VerifyOtpResponse, AppError> {
        if req.phone.trim().is_empty() || req.otp.trim().is_empty() {
            return Err(AppError::validation("Phone & OTP required"));
        }

        // 格式不合法的手机号不可能有账户，按无效请求处理
        let phone = normalize_phone(&req.phone).map_err(|_| AppError::otp_rejected(INVALID_REQUEST))?;

        let mut user = self
            .users
            .find_by_phone(&phone)
            .await?
            .ok_or_else(|| AppError::otp_rejected(INVALID_REQUEST))?;

        let otp = user
            .otp
            .as_ref()
            .ok_or_else(|| AppError::otp_rejected(INVALID_REQUEST))?;

        if otp.is_expired_at(Utc::now()) {
            return Err(AppError::otp_rejected("OTP expired"));
        }

        if !OtpGenerator::matches(&otp.code, &req.otp) {
            tracing::debug!(user_id = %user.id, "Incorrect OTP submitted");
            return Err(AppError::otp_rejected("Incorrect OTP"));
        }

        let tokens = self.jwt_service.generate_token_pair(&user)?;

        user.otp = None;
        user.is_deleted = false;
        user.refresh_token_hash = Some(hash_token(&tokens.refresh_token));

        // 版本冲突说明验证码已被并发使用或重新下发
        let user = self.users.update(&user).await.map_err(|e| match e {
            AppError::Conflict(_) => AppError::otp_rejected(INVALID_REQUEST),
            other => other,
        })?;

        tracing::info!(user_id = %user.id, "User logged in with OTP");

        Ok(VerifyOtpResponse {
            success: true,
            message: "Login successful".to_string(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: user.view(),
        })
    }

    /// 刷新访问令牌
    ///
    /// 刷新令牌本身不轮换；与用户当前保存的值不一致时视为失效
    pub async fn refresh_token(
        &self,
        req: RefreshTokenRequest,
    ) -> Result<RefreshTokenResponse, AppError> {
        let presented = req.refresh_token.trim();
        if presented.is_empty() {
            return Err(AppError::unauthorized("Refresh token missing"));
        }

        let claims = self
            .jwt_service
            .validate_refresh_token(presented)
            .map_err(|e| match e {
                TokenError::Expired => {
                    AppError::unauthorized("Refresh token expired, please log in again")
                }
                TokenError::Invalid => AppError::forbidden(INVALID_REFRESH_TOKEN),
            })?;

        let user_id = claims
            .user_id()
            .map_err(|_| AppError::forbidden(INVALID_REFRESH_TOKEN))?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::forbidden(INVALID_REFRESH_TOKEN))?;

        let current = user.refresh_token_hash.as_deref().unwrap_or_default();
        if user.is_deleted || !token_matches_hash(presented, current) {
            tracing::warn!(user_id = %user.id, "Stale or replayed refresh token");
            return Err(AppError::forbidden(INVALID_REFRESH_TOKEN));
        }

        let access_token = self.jwt_service.generate_access_token(&user)?;

        Ok(RefreshTokenResponse {
            success: true,
            access_token,
        })
    }

    /// 校验访问令牌并解析出用户（认证中间件使用）
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AppError> {
        let claims = self
            .jwt_service
            .validate_access_token(access_token)
            .map_err(|e| match e {
                TokenError::Expired => AppError::unauthorized("Token expired, please refresh"),
                TokenError::Invalid => AppError::unauthorized("Not authorized, invalid token"),
            })?;

        let user_id = claims
            .user_id()
            .map_err(|_| AppError::unauthorized("Not authorized, invalid token"))?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User not found"))?;

        // 删除与令牌有效期无关，有效令牌也会被拒绝
        if user.is_deleted {
            return Err(AppError::forbidden(
                "Account deleted. Login required to reactivate.",
            ));
        }

        Ok(user)
    }

    /// 用户资料
    pub fn profile(&self, user: &User) -> ProfileResponse {
        ProfileResponse {
            success: true,
            user: user.profile(),
        }
    }

    /// 软删除账户并清除刷新令牌
    pub async fn delete_account(&self, user_id: Uuid) -> Result<MessageResponse, AppError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut user = self
                .users
                .find_by_id(user_id)
                .await?
                .ok_or_else(|| AppError::not_found("User not found"))?;

            user.is_deleted = true;
            user.refresh_token_hash = None;

            match self.users.update(&user).await {
                Ok(_) => {
                    tracing::info!(%user_id, "Account soft-deleted");
                    return Ok(MessageResponse::ok(
                        "Account deleted. Login required next time.",
                    ));
                }
                Err(AppError::Conflict(_)) if attempt < MAX_WRITE_ATTEMPTS => continue,
                Err(e) => return Err(e),
            }
        }

        Err(AppError::internal_error("account deletion retries exhausted"))
    }
}
