//! 认证相关的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext, error::AppError, middleware::AppState, models::auth::*,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// 请求体无法解析时统一返回 400，而不是 axum 默认的纯文本拒绝
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        AppError::validation("Invalid request body")
    })
}

/// 发送验证码
pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SendOtpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(body)?;
    let response = state.auth_service.send_otp(req).await?;

    Ok(Json(response))
}

/// 验证码登录
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(body)?;
    let response = state.auth_service.verify_otp(req).await?;

    Ok(Json(response))
}

/// 刷新访问令牌
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    // 缺少请求体等同于缺少刷新令牌
    let req = json_body(body).unwrap_or_default();
    let response = state.auth_service.refresh_token(req).await?;

    Ok(Json(response))
}

/// 当前用户资料
pub async fn profile(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.auth_service.profile(&auth_context.user)))
}

/// 注销账户（软删除）
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let response = state
        .auth_service
        .delete_account(auth_context.user_id)
        .await?;

    Ok(Json(response))
}
