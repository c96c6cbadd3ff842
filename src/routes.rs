//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    http::{header, HeaderName, Method},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};

use crate::{auth::middleware::jwt_auth_middleware, handlers, middleware::AppState};

/// 请求体上限
const MAX_BODY_BYTES: usize = 64 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公共路由（无需认证）
    let public_routes = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check));

    // 验证码登录与令牌刷新
    let auth_routes = Router::new()
        .route("/api/auth/send-otp", post(handlers::auth::send_otp))
        .route("/api/auth/verify-otp", post(handlers::auth::verify_otp))
        .route("/api/auth/refresh-token", post(handlers::auth::refresh_token));

    // 需要访问令牌的路由
    let authenticated_routes = Router::new()
        .route("/api/auth/profile", get(handlers::auth::profile))
        .route("/api/auth/delete-account", delete(handlers::auth::delete_account))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(crate::error::REQUEST_ID_HEADER)]);

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(authenticated_routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
