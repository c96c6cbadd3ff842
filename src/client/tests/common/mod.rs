//! 客户端测试公共模块
//! 在随机端口上启动模拟服务端，并统计各接口的调用次数

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use estate_client::{ApiClient, AuthApi, ClientConfig, MemoryStorage, Session, SessionManager};
use estate_common::{Role, UserView};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const PHONE: &str = "+911234567890";
pub const REFRESH_TOKEN: &str = "refresh-1";

/// 模拟服务端状态
pub struct MockState {
    pub refresh_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    /// 当前有效的访问令牌
    pub valid_access: Mutex<String>,
    /// 刷新接口返回的状态码
    pub refresh_status: Mutex<StatusCode>,
    /// 刷新接口的处理延迟
    pub refresh_delay: Mutex<Duration>,
    /// 资料接口强制返回的状态码
    pub profile_override: Mutex<Option<StatusCode>>,
    /// 资料接口的处理延迟
    pub profile_delay: Mutex<Duration>,
}

impl MockState {
    fn new() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            valid_access: Mutex::new("access-1".to_string()),
            refresh_status: Mutex::new(StatusCode::OK),
            refresh_delay: Mutex::new(Duration::ZERO),
            profile_override: Mutex::new(None),
            profile_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    /// 让当前访问令牌失效，模拟过期
    pub fn expire_access(&self) {
        let mut valid = self.valid_access.lock().unwrap();
        *valid = format!("{}-rotated", valid);
    }
}

pub fn test_user() -> UserView {
    UserView {
        id: uuid::Uuid::new_v4(),
        phone: PHONE.to_string(),
        role: vec![Role::Buyer],
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "success": false, "message": message, "code": status.as_u16() })),
    )
        .into_response()
}

async fn refresh_token(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = *state.refresh_delay.lock().unwrap();
    tokio::time::sleep(delay).await;

    let status = *state.refresh_status.lock().unwrap();
    if status != StatusCode::OK {
        return error(status, "Invalid refresh token");
    }
    if body["refreshToken"] != REFRESH_TOKEN {
        return error(StatusCode::FORBIDDEN, "Invalid refresh token");
    }

    let fresh = format!("access-{}", state.refresh_calls() + 1);
    *state.valid_access.lock().unwrap() = fresh.clone();
    Json(json!({ "success": true, "accessToken": fresh })).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.profile_calls.fetch_add(1, Ordering::SeqCst);

    let delay = *state.profile_delay.lock().unwrap();
    tokio::time::sleep(delay).await;

    let forced = *state.profile_override.lock().unwrap();
    if let Some(status) = forced {
        return error(status, "Server error");
    }

    let valid = state.valid_access.lock().unwrap().clone();
    match bearer(&headers) {
        None => error(StatusCode::UNAUTHORIZED, "Not authorized, token missing"),
        Some(token) if token != valid => {
            error(StatusCode::UNAUTHORIZED, "Token expired, please refresh")
        }
        Some(_) => Json(json!({
            "success": true,
            "user": {
                "id": uuid::Uuid::new_v4().to_string(),
                "phone": PHONE,
                "role": ["buyer"],
                "isDeleted": false,
                "createdAt": "2025-01-01T00:00:00Z",
                "updatedAt": "2025-01-01T00:00:00Z"
            }
        }))
        .into_response(),
    }
}

async fn delete_account(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let valid = state.valid_access.lock().unwrap().clone();
    if bearer(&headers).as_deref() != Some(valid.as_str()) {
        return error(StatusCode::UNAUTHORIZED, "Token expired, please refresh");
    }
    Json(json!({ "success": true, "message": "Account deleted. Login required next time." }))
        .into_response()
}

/// 在随机端口启动模拟服务端
pub async fn spawn_mock() -> (SocketAddr, Arc<MockState>) {
    let state = Arc::new(MockState::new());
    let app = Router::new()
        .route("/api/auth/refresh-token", post(refresh_token))
        .route("/api/auth/profile", get(profile))
        .route("/api/auth/delete-account", delete(delete_account))
        .with_state(state.clone());

    let addr = serve(app).await;
    (addr, state)
}

/// 在随机端口上运行任意路由
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig {
        base_url: format!("http://{}/api", addr),
        timeout_secs: 5,
        ..ClientConfig::default()
    }
}

pub struct TestClient {
    pub session: Arc<SessionManager>,
    pub client: Arc<ApiClient>,
    pub api: AuthApi,
}

/// 使用内存存储的客户端
pub fn client_for(addr: SocketAddr) -> TestClient {
    let session = Arc::new(SessionManager::new(Arc::new(MemoryStorage::new())));
    let client = Arc::new(ApiClient::new(config_for(addr), session.clone()).unwrap());
    let api = AuthApi::new(client.clone());
    TestClient {
        session,
        client,
        api,
    }
}

/// 以给定访问令牌登录
pub async fn sign_in(session: &SessionManager, access_token: &str) {
    session
        .login(Session {
            user: test_user(),
            access_token: access_token.to_string(),
            refresh_token: REFRESH_TOKEN.to_string(),
        })
        .await
        .unwrap();
}
