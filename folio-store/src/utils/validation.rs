//! Input validation helpers
//!
//! Centralized text length constants and validation functions. Everything
//! here runs before a store write; a failure never reaches the store.

use crate::common::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Names: business, client, catalog category, template
pub const MAX_NAME_LEN: usize = 200;

/// Line descriptions, slogans, quote titles
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Free-text terms and conditions
pub const MAX_TERMS_LEN: usize = 4000;

/// Short identifiers: phone, unit label, color codes
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Minimum digits in a client phone number
pub const MIN_PHONE_DIGITS: usize = 10;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-blank and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, "must not be empty"));
    }
    validate_len(value, field, max_len)
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(value: &Option<String>, field: &str, max_len: usize) -> Result<(), AppError> {
    if let Some(v) = value {
        validate_len(v, field, max_len)?;
    }
    Ok(())
}

pub fn validate_len(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len > max_len {
        return Err(AppError::validation(
            field,
            format!("is too long ({len} chars, max {max_len})"),
        ));
    }
    Ok(())
}

/// Required phone number with at least [`MIN_PHONE_DIGITS`] digits once
/// everything that is not a digit is stripped.
pub fn validate_phone(value: &str, field: &str) -> Result<(), AppError> {
    validate_required_text(value, field, MAX_SHORT_TEXT_LEN)?;
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if digits < MIN_PHONE_DIGITS {
        return Err(AppError::validation(
            field,
            format!("must contain at least {MIN_PHONE_DIGITS} digits"),
        ));
    }
    Ok(())
}

/// `#rrggbb`
pub fn validate_hex_color(value: &str, field: &str) -> Result<(), AppError> {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(AppError::validation(field, "must be a #rrggbb color"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("Ana", "client", MAX_NAME_LEN).is_ok());
        assert!(validate_required_text("   ", "client", MAX_NAME_LEN).is_err());
        assert!(validate_required_text(&"x".repeat(201), "client", MAX_NAME_LEN).is_err());
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        assert!(validate_len(&"ñ".repeat(100), "unit", MAX_SHORT_TEXT_LEN).is_ok());
    }

    #[test]
    fn test_phone_digits_after_stripping() {
        assert!(validate_phone("(55) 1234-5678", "phone").is_ok());
        assert!(validate_phone("+52 55 1234 5678", "phone").is_ok());
        let err = validate_phone("555-1234", "phone").unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: phone: must contain at least 10 digits");
        assert!(validate_phone("", "phone").is_err());
    }

    #[test]
    fn test_hex_color() {
        assert!(validate_hex_color("#1e293b", "color").is_ok());
        assert!(validate_hex_color("#1E293B", "color").is_ok());
        assert!(validate_hex_color("1e293b", "color").is_err());
        assert!(validate_hex_color("#fff", "color").is_err());
        assert!(validate_hex_color("#12345g", "color").is_err());
    }
}
