// Validation utilities module
// Provides custom validation functions for domain-specific rules

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use validator::ValidationError;

static COUPON_CODE_RE: OnceLock<Regex> = OnceLock::new();

/// Validates that a coupon code is 3-32 characters of letters, digits,
/// dashes or underscores. Codes are compared case-insensitively, so both
/// "save20" and "SAVE20" pass.
pub fn validate_coupon_code(code: &str) -> Result<(), ValidationError> {
    let re = COUPON_CODE_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{3,32}$").expect("valid coupon code pattern"));
    if re.is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_coupon_code"))
    }
}

/// Validates that a monetary amount is strictly positive
pub fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        Err(ValidationError::new("amount_must_be_positive"))
    } else {
        Ok(())
    }
}

/// Validates that a monetary amount is not negative (zero allowed,
/// e.g. tax or shipping)
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        Err(ValidationError::new("amount_must_not_be_negative"))
    } else {
        Ok(())
    }
}

/// Validates that a quantity is at least 1
pub fn validate_positive_quantity(quantity: i32) -> Result<(), ValidationError> {
    if quantity <= 0 {
        Err(ValidationError::new("quantity_must_be_positive"))
    } else {
        Ok(())
    }
}
