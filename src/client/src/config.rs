//! 客户端配置

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 客户端配置
///
/// 环境变量前缀为 `ESTATE_CLIENT_`，例如 `ESTATE_CLIENT_BASE_URL`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API 根地址（包含 `/api` 前缀）
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 单次请求超时（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// 会话文件路径
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_storage_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".estate")
        .join("session.json")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            storage_path: default_storage_path(),
        }
    }
}

impl ClientConfig {
    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: ClientConfig = Config::builder()
            .add_source(
                Environment::with_prefix("ESTATE_CLIENT")
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if config.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 拼接接口地址，`path` 以 `/` 开头
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000/api");
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert!(config.storage_path.ends_with(".estate/session.json"));
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ClientConfig {
            base_url: "http://example.com/api/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(
            config.endpoint("/auth/send-otp"),
            "http://example.com/api/auth/send-otp"
        );
    }
}
