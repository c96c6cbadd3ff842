//! Wire types shared between estate-auth and estate-client

pub mod keys;
pub mod messages;
pub mod role;

pub use messages::{
    ErrorBody, MessageResponse, ProfileResponse, RefreshTokenRequest, RefreshTokenResponse,
    SendOtpRequest, UserProfile, UserView, VerifyOtpRequest, VerifyOtpResponse,
};
pub use role::{parse_roles, Role, UnknownRole};
