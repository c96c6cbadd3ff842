//! 健康检查 API 集成测试

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

mod common;
use common::{TestApp, TEST_PHONE};

#[tokio::test]
async fn test_root_endpoint() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"API is running...");
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], estate_auth::VERSION);
    assert_eq!(json["storage"], "memory");
    assert!(json.get("database").is_none());
}

#[tokio::test]
async fn test_trace_id_is_echoed() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-trace-id", "trace-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-trace-id"], "trace-abc");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_with_bearer_is_not_found() {
    let app = TestApp::new();
    let (access_token, _) = app.login(TEST_PHONE).await;

    for uri in ["/nope", "/api/auth/logout", "/api/auth/profile/extra"] {
        let (status, _) = app.request(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} without token", uri);

        let (status, _) = app.request(Method::GET, uri, None, Some(&access_token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} with token", uri);
    }

    // 已注册路由仍然需要令牌
    let (status, _) = app
        .request(Method::GET, "/api/auth/profile", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
