//! 客户端持久化会话使用的存储键

pub const USER: &str = "user";
pub const ACCESS_TOKEN: &str = "accessToken";
pub const REFRESH_TOKEN: &str = "refreshToken";

/// 会话的全部键，登出时一并清除
pub const ALL: [&str; 3] = [USER, ACCESS_TOKEN, REFRESH_TOKEN];
