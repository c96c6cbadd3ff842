//! 认证拦截器测试：刷新、重放、登出与取消

use axum::http::StatusCode;
use estate_client::{ApiRequest, ClientError};
use estate_common::ProfileResponse;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod common;
use common::{client_for, config_for, sign_in, spawn_mock};

#[tokio::test]
async fn test_valid_token_needs_no_refresh() {
    let (addr, mock) = spawn_mock().await;
    let client = client_for(addr);
    sign_in(&client.session, "access-1").await;

    let profile = client.api.profile().await.unwrap();
    assert_eq!(profile.phone, common::PHONE);
    assert_eq!(mock.refresh_calls(), 0);
    assert_eq!(mock.profile_calls(), 1);
}

#[tokio::test]
async fn test_expired_token_refreshes_once_and_replays() {
    let (addr, mock) = spawn_mock().await;
    let client = client_for(addr);
    sign_in(&client.session, "access-1").await;
    mock.expire_access();

    let profile = client.api.profile().await.unwrap();
    assert!(!profile.is_deleted);

    assert_eq!(mock.refresh_calls(), 1);
    // 原请求 + 一次重放
    assert_eq!(mock.profile_calls(), 2);

    let stored = client.session.access_token().unwrap();
    assert_eq!(stored, *mock.valid_access.lock().unwrap());
    // 刷新令牌保持不变
    assert_eq!(client.session.refresh_token().as_deref(), Some(common::REFRESH_TOKEN));
}

#[tokio::test]
async fn test_refresh_failure_logs_out_and_surfaces_original_error() {
    let (addr, mock) = spawn_mock().await;
    let client = client_for(addr);
    sign_in(&client.session, "access-1").await;
    mock.expire_access();
    *mock.refresh_status.lock().unwrap() = StatusCode::FORBIDDEN;

    let mut changes = client.session.subscribe();

    let err = client.api.profile().await.unwrap_err();
    match err {
        ClientError::Auth(message) => assert_eq!(message, "Token expired, please refresh"),
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(mock.refresh_calls(), 1);
    assert_eq!(mock.profile_calls(), 1);
    assert!(!client.session.is_authenticated());

    // 订阅者能观察到登出
    changes.changed().await.unwrap();
    assert!(changes.borrow().is_none());
}

#[tokio::test]
async fn test_no_refresh_token_clears_session() {
    let (addr, mock) = spawn_mock().await;
    let client = client_for(addr);

    // 未登录时请求需要认证的接口
    let err = client.api.profile().await.unwrap_err();
    assert!(err.is_auth());
    assert_eq!(mock.refresh_calls(), 0);
    assert!(!client.session.is_authenticated());
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let (addr, mock) = spawn_mock().await;
    let client = client_for(addr);
    sign_in(&client.session, "access-1").await;
    mock.expire_access();
    *mock.refresh_delay.lock().unwrap() = Duration::from_millis(200);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let api_client = client.client.clone();
        handles.push(tokio::spawn(async move {
            api_client
                .send::<ProfileResponse>(ApiRequest::get("/auth/profile"))
                .await
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert!(response.success);
    }

    assert_eq!(mock.refresh_calls(), 1);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let (addr, mock) = spawn_mock().await;
    let client = client_for(addr);
    sign_in(&client.session, "access-1").await;
    *mock.profile_override.lock().unwrap() = Some(StatusCode::INTERNAL_SERVER_ERROR);

    let err = client.api.profile().await.unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 500, .. }));
    assert_eq!(mock.profile_calls(), 1);
    assert_eq!(mock.refresh_calls(), 0);
    assert!(client.session.is_authenticated());
}

#[tokio::test]
async fn test_network_error_is_not_retried() {
    // 绑定后立即释放端口，连接会被拒绝
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr);
    sign_in(&client.session, "access-1").await;

    let err = client.api.profile().await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
    assert!(err.to_string().contains("check your connection"));
    assert!(client.session.is_authenticated());
}

#[tokio::test]
async fn test_cancelled_request() {
    let (addr, mock) = spawn_mock().await;
    let client = client_for(addr);
    sign_in(&client.session, "access-1").await;
    *mock.profile_delay.lock().unwrap() = Duration::from_secs(2);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client.api.profile_cancellable(&cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert_eq!(client.session.access_token().as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_delete_account_clears_session() {
    let (addr, _mock) = spawn_mock().await;
    let client = client_for(addr);
    sign_in(&client.session, "access-1").await;

    let response = client.api.delete_account().await.unwrap();
    assert_eq!(response.message, "Account deleted. Login required next time.");
    assert!(!client.session.is_authenticated());
}

#[tokio::test]
async fn test_client_side_validation_skips_network() {
    let (addr, _mock) = spawn_mock().await;
    let client = client_for(addr);

    let err = client.api.send_otp("  ", &[estate_common::Role::Buyer]).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(ref m) if m == "Phone & role required"));

    let err = client.api.send_otp(common::PHONE, &[]).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let err = client.api.verify_otp(common::PHONE, "").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(ref m) if m == "Phone & OTP required"));
}

#[tokio::test]
async fn test_new_client_starts_signed_out() {
    let (addr, _mock) = spawn_mock().await;
    let config = config_for(addr);
    assert!(config.endpoint("/auth/profile").ends_with("/api/auth/profile"));

    let session = Arc::new(estate_client::SessionManager::new(Arc::new(
        estate_client::MemoryStorage::new(),
    )));
    let client = estate_client::ApiClient::new(config, session).unwrap();
    assert!(!client.session().is_authenticated());
}
