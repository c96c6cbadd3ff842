//! 带认证拦截的 HTTP 客户端
//!
//! 每个需要认证的请求都带上当前访问令牌。收到 401 时用刷新令牌换取新的
//! 访问令牌并重放原请求一次；刷新失败则登出并返回原始错误。

use crate::{config::ClientConfig, error::ClientError, session::SessionManager};
use estate_common::{RefreshTokenRequest, RefreshTokenResponse};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// 可重放的请求描述
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            body: None,
        }
    }

    pub fn delete(path: &str) -> Self {
        Self {
            method: Method::DELETE,
            path: path.to_string(),
            body: None,
        }
    }

    pub fn post<T: Serialize>(path: &str, body: &T) -> Result<Self, ClientError> {
        let body = serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(Self {
            method: Method::POST,
            path: path.to_string(),
            body: Some(body),
        })
    }
}

pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    session: Arc<SessionManager>,
    /// 同一时间只允许一个刷新请求
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: Arc<SessionManager>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            config,
            session,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// 不需要认证的请求，不会触发刷新
    pub async fn send_public<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.dispatch(&request, None).await?;
        decode(response).await
    }

    /// 需要认证的请求
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let token = self.session.access_token();
        let response = self.dispatch(&request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return decode(response).await;
        }

        let original = ClientError::from_response(response).await;
        tracing::debug!(path = %request.path, error = %original, "Access token rejected, refreshing");

        let fresh = match self.refresh_access_token(token.as_deref()).await {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, signing out");
                if let Err(e) = self.session.logout().await {
                    tracing::warn!(error = %e, "Failed to clear stored session");
                }
                return Err(original);
            }
        };

        // 只重放一次，再次 401 直接返回
        let response = self.dispatch(&request, Some(&fresh)).await?;
        decode(response).await
    }

    /// 可取消的认证请求，取消后结果不会写回会话
    pub async fn send_cancellable<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(path = %request.path, "Request cancelled");
                Err(ClientError::Cancelled)
            }
            result = self.send(request.clone()) => result,
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.config.endpoint(&request.path));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// 换取新的访问令牌
    ///
    /// `stale` 是被拒绝的令牌；等锁期间其他请求已经刷新过的话直接复用
    async fn refresh_access_token(&self, stale: Option<&str>) -> Result<String, ClientError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.session.access_token() {
            if stale != Some(current.as_str()) {
                return Ok(current);
            }
        }

        let refresh_token = self
            .session
            .refresh_token()
            .ok_or_else(|| ClientError::Auth("Session expired, please log in again".to_string()))?;

        let response = self
            .http
            .post(self.config.endpoint("/auth/refresh-token"))
            .json(&RefreshTokenRequest { refresh_token })
            .send()
            .await?;
        let body: RefreshTokenResponse = decode(response).await?;

        self.session.set_access_token(body.access_token.clone()).await?;
        tracing::debug!("Access token refreshed");

        Ok(body.access_token)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::from_response(response).await);
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}
