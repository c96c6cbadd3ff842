//! 客户端错误模型

use estate_common::ErrorBody;
use reqwest::StatusCode;
use thiserror::Error;

/// 会话存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt session data: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// 客户端错误类型
///
/// 只有访问令牌过期触发的一次刷新重放会重试，其余错误直接返回给调用方
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Network error, please check your connection and try again ({0})")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl ClientError {
    /// 按 HTTP 状态码归类失败响应
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status.as_u16() {
            401 | 403 => ClientError::Auth(message),
            404 => ClientError::NotFound(message),
            409 => ClientError::Conflict(message),
            400..=499 => ClientError::Validation(message),
            code => ClientError::Server {
                status: code,
                message,
            },
        }
    }

    /// 读取失败响应的 `{message}` 并归类
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        Self::from_status(status, message)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        let cases = [
            (400, "validation"),
            (422, "validation"),
            (401, "auth"),
            (403, "auth"),
            (404, "not_found"),
            (409, "conflict"),
            (500, "server"),
            (503, "server"),
        ];

        for (code, kind) in cases {
            let err = ClientError::from_status(StatusCode::from_u16(code).unwrap(), "msg");
            let actual = match err {
                ClientError::Validation(_) => "validation",
                ClientError::Auth(_) => "auth",
                ClientError::NotFound(_) => "not_found",
                ClientError::Conflict(_) => "conflict",
                ClientError::Server { .. } => "server",
                _ => "other",
            };
            assert_eq!(actual, kind, "status {}", code);
        }
    }

    #[test]
    fn test_message_is_displayed_verbatim() {
        let err = ClientError::from_status(StatusCode::BAD_REQUEST, "Incorrect OTP");
        assert_eq!(err.to_string(), "Incorrect OTP");
    }

    #[test]
    fn test_network_error_is_actionable() {
        let err = ClientError::Network("connection refused".to_string());
        assert!(err.to_string().contains("check your connection"));
    }
}
