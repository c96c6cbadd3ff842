//! JWT 认证中间件

use crate::{error::AppError, middleware::AppState, models::User};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use estate_common::Role;
use std::sync::Arc;
use uuid::Uuid;

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub phone: String,
    pub roles: Vec<Role>,
    /// 已解析的用户记录（不含验证码）
    pub user: User,
}

impl AuthContext {
    pub fn from_user(mut user: User) -> Self {
        user.otp = None;
        Self {
            user_id: user.id,
            phone: user.phone.clone(),
            roles: user.roles.clone(),
            user,
        }
    }
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Not authorized, token missing"))
    }
}

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::unauthorized("Not authorized, token missing"))
}

/// JWT 认证中间件 - 必须认证
///
/// 令牌有效但账户已软删除时返回 403
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 从 Authorization 头提取令牌
    let token = extract_token(req.headers())?;

    // 验证令牌并解析用户
    let user = state.auth_service.authenticate(&token).await?;

    // 附加到请求扩展
    req.extensions_mut().insert(AuthContext::from_user(user));

    Ok(next.run(req).await)
}
