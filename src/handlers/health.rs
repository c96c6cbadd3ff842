//! 健康检查处理器

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{db, middleware::AppState};

/// 存活探针响应
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// 根路径
pub async fn root() -> &'static str {
    "API is running..."
}

/// 存活探针
///
/// 使用 PostgreSQL 存储时附带数据库连通性
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (storage, database) = match &state.db {
        Some(pool) => {
            let status = match db::health_check(pool).await {
                db::HealthStatus::Healthy => "healthy".to_string(),
                db::HealthStatus::Unhealthy(msg) => format!("unhealthy: {}", msg),
            };
            ("postgres", Some(status))
        }
        None => ("memory", None),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        storage,
        database,
    })
}
