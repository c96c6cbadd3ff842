//! 验证码登录流程

use crate::{
    error::ClientError,
    http::{ApiClient, ApiRequest},
    session::{Session, SessionManager},
};
use estate_common::{
    MessageResponse, ProfileResponse, Role, SendOtpRequest, UserProfile, VerifyOtpRequest,
    VerifyOtpResponse,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AuthApi {
    client: Arc<ApiClient>,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    fn session(&self) -> &Arc<SessionManager> {
        self.client.session()
    }

    /// 请求发送验证码
    pub async fn send_otp(&self, phone: &str, roles: &[Role]) -> Result<MessageResponse, ClientError> {
        let phone = phone.trim();
        if phone.is_empty() || roles.is_empty() {
            return Err(ClientError::Validation("Phone & role required".to_string()));
        }

        let request = SendOtpRequest {
            phone: phone.to_string(),
            role: roles.iter().map(|r| r.as_str().to_string()).collect(),
        };
        self.client
            .send_public(ApiRequest::post("/auth/send-otp", &request)?)
            .await
    }

    /// 校验验证码，成功后保存会话
    pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session, ClientError> {
        let phone = phone.trim();
        let code = code.trim();
        if phone.is_empty() || code.is_empty() {
            return Err(ClientError::Validation("Phone & OTP required".to_string()));
        }

        let request = VerifyOtpRequest {
            phone: phone.to_string(),
            otp: code.to_string(),
        };
        let response: VerifyOtpResponse = self
            .client
            .send_public(ApiRequest::post("/auth/verify-otp", &request)?)
            .await?;

        let session = Session {
            user: response.user,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        };
        self.session().login(session.clone()).await?;

        Ok(session)
    }

    /// 当前用户资料
    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        let response: ProfileResponse = self.client.send(ApiRequest::get("/auth/profile")).await?;
        Ok(response.user)
    }

    /// 可取消的资料请求
    pub async fn profile_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Result<UserProfile, ClientError> {
        let response: ProfileResponse = self
            .client
            .send_cancellable(ApiRequest::get("/auth/profile"), cancel)
            .await?;
        Ok(response.user)
    }

    /// 注销账户，成功后清除本地会话
    pub async fn delete_account(&self) -> Result<MessageResponse, ClientError> {
        let response: MessageResponse = self
            .client
            .send(ApiRequest::delete("/auth/delete-account"))
            .await?;
        self.session().logout().await?;
        Ok(response)
    }

    /// 本地登出，服务端没有对应接口
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session().logout().await
    }
}
