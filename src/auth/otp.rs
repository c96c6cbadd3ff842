//! One-time passcode generation and phone number normalization

use crate::error::AppError;
use once_cell::sync::Lazy;
use rand::{thread_rng, Rng};
use regex::Regex;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{8,15}$").unwrap());

/// OTP generator
pub struct OtpGenerator;

impl OtpGenerator {
    /// Generate a numeric code with exactly `length` digits (no leading zero)
    pub fn generate(length: u32) -> String {
        let low = 10u32.pow(length - 1);
        let high = 10u32.pow(length);
        thread_rng().gen_range(low..high).to_string()
    }

    /// Constant-time comparison of a stored and a submitted code
    pub fn matches(stored: &str, submitted: &str) -> bool {
        bool::from(stored.as_bytes().ct_eq(submitted.trim().as_bytes()))
    }
}

/// Normalize a phone number: strip surrounding whitespace, spaces and dashes
pub fn normalize_phone(raw: &str) -> Result<String, AppError> {
    let phone: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();

    if !PHONE_RE.is_match(&phone) {
        return Err(AppError::validation("Invalid phone number"));
    }

    Ok(phone)
}

/// Hash token for storage using SHA-256
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare a presented token against a stored hash in constant time
pub fn token_matches_hash(token: &str, stored_hash: &str) -> bool {
    bool::from(hash_token(token).as_bytes().ct_eq(stored_hash.as_bytes()))
}
