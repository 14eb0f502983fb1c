use std::fmt;

pub const VOUCHER_CODE_MIN_LEN: usize = 4;
pub const VOUCHER_CODE_MAX_LEN: usize = 20;
pub const DESCRIPTION_MAX_LEN: usize = 255;
pub const QUEUE_CODE_LEN: usize = 6;
pub const BOOKING_CODE_LEN: usize = 8;
pub const ALLOWED_EWALLET_TYPES: &[&str] = &["gcash", "paymaya"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_enum(field: &'static str, value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.iter().all(|candidate| value != *candidate) {
        return Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

/// Voucher codes are stored uppercase; input is normalized before this check.
pub fn validate_voucher_code(code: &str) -> ValidationResult {
    let code = sanitize_string(code);
    validate_required("code", &code)?;

    if code.len() < VOUCHER_CODE_MIN_LEN || code.len() > VOUCHER_CODE_MAX_LEN {
        return Err(ValidationError::new(
            "code",
            format!(
                "must be between {} and {} characters",
                VOUCHER_CODE_MIN_LEN, VOUCHER_CODE_MAX_LEN
            ),
        ));
    }

    if !code
        .chars()
        .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
    {
        return Err(ValidationError::new(
            "code",
            "must contain only uppercase letters and digits",
        ));
    }

    Ok(())
}

pub fn validate_positive_amount(field: &'static str, amount: i64) -> ValidationResult {
    if amount <= 0 {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_min_amount(field: &'static str, amount: i64, minimum: i64) -> ValidationResult {
    validate_positive_amount(field, amount)?;

    if amount < minimum {
        return Err(ValidationError::new(
            field,
            format!("must be at least {} centavos", minimum),
        ));
    }

    Ok(())
}

pub fn validate_ewallet_type(ewallet_type: &str) -> ValidationResult {
    let ewallet_type = sanitize_string(ewallet_type);
    validate_required("ewallet_type", &ewallet_type)?;
    validate_enum("ewallet_type", &ewallet_type, ALLOWED_EWALLET_TYPES)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
    }

    #[test]
    fn validates_enum_values() {
        assert!(validate_enum("status", "pending", &["pending", "completed"]).is_ok());
        assert!(validate_enum("status", "unknown", &["pending", "completed"]).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string("single"), "single");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
    }

    #[test]
    fn validates_voucher_code() {
        assert!(validate_voucher_code("SAVE100").is_ok());
        assert!(validate_voucher_code("  SAVE100  ").is_ok());
        assert!(validate_voucher_code("save100").is_err());
        assert!(validate_voucher_code("ABC").is_err());
        assert!(validate_voucher_code(&"A".repeat(21)).is_err());
        assert!(validate_voucher_code("SAVE 100").is_err());
        assert!(validate_voucher_code("").is_err());
    }

    #[test]
    fn validates_positive_amount() {
        assert!(validate_positive_amount("amount", 1).is_ok());
        assert!(validate_positive_amount("amount", 0).is_err());
        assert!(validate_positive_amount("amount", -500).is_err());
    }

    #[test]
    fn validates_min_amount() {
        assert!(validate_min_amount("amount", 10000, 10000).is_ok());
        assert!(validate_min_amount("amount", 9999, 10000).is_err());
        assert!(validate_min_amount("amount", 0, 10000).is_err());
    }

    #[test]
    fn validates_ewallet_type() {
        assert!(validate_ewallet_type("gcash").is_ok());
        assert!(validate_ewallet_type("paymaya").is_ok());
        assert!(validate_ewallet_type("visa").is_err());
        assert!(validate_ewallet_type("").is_err());
    }
}
