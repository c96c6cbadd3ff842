//! estate-auth 客户端
//! 会话持久化、自动刷新令牌的 HTTP 客户端和验证码登录流程

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod storage;

pub use auth::AuthApi;
pub use config::ClientConfig;
pub use error::{ClientError, StorageError};
pub use http::{ApiClient, ApiRequest};
pub use session::{Session, SessionManager};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
