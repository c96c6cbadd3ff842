//! Authentication-related models
//!
//! The wire shapes are shared with the client through `estate-common`.

pub use estate_common::messages::{
    MessageResponse, ProfileResponse, RefreshTokenRequest, RefreshTokenResponse, SendOtpRequest,
    VerifyOtpRequest, VerifyOtpResponse,
};
