//! Input validation functions
//!
//! Field presence and email syntax are covered by the `validator` derives on
//! the request types; the checks here cover formats the derives do not.

use regex_lite::Regex;
use std::sync::OnceLock;

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9]{1,15}$").expect("phone regex is valid"))
}

/// Validate phone number format: optional leading `+` and up to 15 digits
pub fn validate_phone_number(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("Phone number cannot be empty".to_string());
    }
    if !phone_regex().is_match(phone) {
        return Err("Invalid phone number format".to_string());
    }
    Ok(())
}
