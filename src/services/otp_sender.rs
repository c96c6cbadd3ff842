//! 验证码下发通道

use crate::error::AppError;
use async_trait::async_trait;

/// 将验证码送达用户（短信等带外通道）
///
/// 验证码只经由这里离开服务，HTTP 响应中不会出现
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, phone: &str, code: &str) -> Result<(), AppError>;
}

/// 把验证码写入日志的下发通道，用于开发环境
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send(&self, phone: &str, code: &str) -> Result<(), AppError> {
        tracing::info!(%phone, %code, "OTP issued");
        Ok(())
    }
}
