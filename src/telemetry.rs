//! 日志与追踪系统
//! 初始化结构化日志，请求日志带上 http_request span 的 request_id

use crate::config::AppConfig;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// 依赖库的默认级别，避免 sqlx 逐条打印查询
const QUIET_DEPENDENCIES: &[&str] = &["sqlx=warn", "hyper=warn", "tower_http=info"];

/// 未设置 RUST_LOG 时使用的过滤规则
fn default_filter(level: &str) -> String {
    let mut directives = vec![level.to_lowercase()];
    directives.extend(QUIET_DEPENDENCIES.iter().map(|d| d.to_string()));
    directives.join(",")
}

/// 初始化日志与追踪系统
pub fn init_telemetry(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.logging.level)));

    let log_layer = match config.logging.format.to_lowercase().as_str() {
        // 每行带上当前 span，便于按 request_id 检索
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .with_span_events(FmtSpan::NONE)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .init();

    tracing::info!(
        service = "estate-auth",
        version = crate::VERSION,
        level = %config.logging.level,
        format = %config.logging.format,
        "Telemetry initialized"
    );
}
