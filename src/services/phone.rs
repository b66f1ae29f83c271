// services/phone.rs
use crate::errors::{AppError, Result};

/// Rejects anything the relay cannot prepend a country code to. Length and
/// prefix are left to the gateway.
pub fn ensure_digits(phone: &str) -> Result<()> {
    if phone.is_empty() {
        return Err(AppError::invalid_data("phoneNumber must not be empty"));
    }
    if !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::invalid_data(format!(
            "phoneNumber must contain digits only, got '{}'",
            phone
        )));
    }
    Ok(())
}

/// Loose local-format check: nine digits starting with 7 or 1.
pub fn looks_like_subscriber_number(phone: &str) -> bool {
    phone.len() == 9
        && phone.bytes().all(|b| b.is_ascii_digit())
        && matches!(phone.as_bytes()[0], b'7' | b'1')
}

pub fn format_phone_number(country_code: &str, phone: &str) -> String {
    format!("{}{}", country_code, phone)
}
