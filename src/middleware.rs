//! HTTP 中间件
//! 应用状态与请求追踪

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    error::{AppError, REQUEST_ID, REQUEST_ID_HEADER},
    repository::UserStore,
    services::{AuthService, OtpSender},
};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

const TRACE_ID_HEADER: &str = "x-trace-id";

/// 应用状态
///
/// 服务以 Arc 共享，克隆只复制指针
#[derive(Clone)]
pub struct AppState {
    /// 使用 PostgreSQL 存储时的连接池，内存存储时为空
    pub db: Option<PgPool>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        users: Arc<dyn UserStore>,
        otp_sender: Arc<dyn OtpSender>,
    ) -> Result<Self, AppError> {
        let jwt_service = Arc::new(JwtService::from_config(config)?);
        let auth_service = Arc::new(AuthService::new(
            users,
            jwt_service,
            otp_sender,
            config,
        ));

        Ok(Self {
            db: None,
            auth_service,
        })
    }

    /// 关联数据库连接池（健康检查使用）
    pub fn with_db(mut self, db: PgPool) -> Self {
        self.db = Some(db);
        self
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();
        let mut response = REQUEST_ID.scope(request_id.clone(), next.run(req)).await;
        let elapsed = start.elapsed();

        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_class = match status {
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_class)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            headers.insert(TRACE_ID_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(REQUEST_ID_HEADER, value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
