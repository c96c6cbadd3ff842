//! Business logic services layer

pub mod auth_service;
pub mod otp_sender;

pub use auth_service::AuthService;
pub use otp_sender::{LogOtpSender, OtpSender};
