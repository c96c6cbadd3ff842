//! 测试公共模块
//! 提供测试配置、可记录的验证码通道和 HTTP 请求辅助函数

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use estate_auth::{
    config::{AppConfig, DatabaseConfig, LoggingConfig, OtpConfig, SecurityConfig, ServerConfig},
    error::AppError,
    middleware::AppState,
    repository::InMemoryUserStore,
    routes,
    services::OtpSender,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const TEST_PHONE: &str = "+911234567890";

/// 创建测试配置
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: std::env::var("TEST_DATABASE_URL").ok().map(Secret::new),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Secret::new("test-secret-key-for-testing-only-min-32-chars".to_string()),
            access_token_exp_secs: 300,
            refresh_token_exp_secs: 3600,
        },
        otp: OtpConfig {
            ttl_secs: 120,
            code_length: 4,
        },
    }
}

/// 记录每个手机号最近一次收到的验证码
#[derive(Default)]
pub struct RecordingOtpSender {
    codes: Mutex<HashMap<String, String>>,
    sent: Mutex<usize>,
}

impl RecordingOtpSender {
    pub fn last_code(&self, phone: &str) -> Option<String> {
        self.codes.lock().unwrap().get(phone).cloned()
    }

    pub fn sent_count(&self) -> usize {
        *self.sent.lock().unwrap()
    }
}

#[async_trait]
impl OtpSender for RecordingOtpSender {
    async fn send(&self, phone: &str, code: &str) -> Result<(), AppError> {
        self.codes
            .lock()
            .unwrap()
            .insert(phone.to_string(), code.to_string());
        *self.sent.lock().unwrap() += 1;
        Ok(())
    }
}

/// 基于内存存储的测试应用
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub users: Arc<InMemoryUserStore>,
    pub sender: Arc<RecordingOtpSender>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(create_test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let users = Arc::new(InMemoryUserStore::new());
        let sender = Arc::new(RecordingOtpSender::default());
        let state = Arc::new(
            AppState::new(&config, users.clone(), sender.clone())
                .expect("Failed to create app state"),
        );
        let router = routes::create_router(state.clone());

        Self {
            router,
            state,
            users,
            sender,
        }
    }

    /// 发送请求并解析 JSON 响应
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn send_otp(&self, phone: &str, role: &str) -> (StatusCode, Value) {
        self.post("/api/auth/send-otp", json!({ "phone": phone, "role": role }))
            .await
    }

    pub async fn verify_otp(&self, phone: &str, otp: &str) -> (StatusCode, Value) {
        self.post("/api/auth/verify-otp", json!({ "phone": phone, "otp": otp }))
            .await
    }

    /// 完整登录流程，返回 (访问令牌, 刷新令牌)
    pub async fn login(&self, phone: &str) -> (String, String) {
        let (status, _) = self.send_otp(phone, "buyer").await;
        assert_eq!(status, StatusCode::OK);

        let code = self.sender.last_code(phone).expect("OTP was not sent");
        let (status, body) = self.verify_otp(phone, &code).await;
        assert_eq!(status, StatusCode::OK, "verify failed: {}", body);

        (
            body["accessToken"].as_str().unwrap().to_string(),
            body["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    pub async fn refresh(&self, refresh_token: &str) -> (StatusCode, Value) {
        self.post(
            "/api/auth/refresh-token",
            json!({ "refreshToken": refresh_token }),
        )
        .await
    }

    pub async fn profile(&self, access_token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, "/api/auth/profile", None, Some(access_token))
            .await
    }
}

/// 返回一个与给定验证码不同的同长度验证码
pub fn wrong_code(code: &str) -> String {
    code.chars()
        .map(|c| if c == '9' { '0' } else { '9' })
        .collect()
}

/// 初始化测试数据库
///
/// 未设置 TEST_DATABASE_URL 时返回 None，依赖数据库的测试直接跳过
pub async fn setup_test_db() -> Option<sqlx::PgPool> {
    let config = create_test_config();
    config.database.url.as_ref()?;

    let pool = estate_auth::db::create_pool(&config.database)
        .await
        .expect("Failed to create test database pool");

    estate_auth::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query("TRUNCATE TABLE users")
        .execute(&pool)
        .await
        .expect("Failed to cleanup test database");

    Some(pool)
}
