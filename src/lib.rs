//! 手机验证码登录服务
//! 验证码下发与校验、JWT 令牌签发与刷新、账户注销

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;

/// 服务版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
