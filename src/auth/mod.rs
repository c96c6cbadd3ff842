//! Authentication and authorization module

pub mod jwt;
pub mod middleware;
pub mod otp;

pub use jwt::{Claims, JwtService, TokenError, TokenPair};
pub use middleware::{extract_token, jwt_auth_middleware, AuthContext};
pub use otp::{hash_token, normalize_phone, OtpGenerator};
