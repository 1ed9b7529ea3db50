//! # Validation
//!
//! Input validation for cart and catalog operations. These run before any
//! storage access; the database constraints (NOT NULL, CHECK, FK) are the
//! second line of defense.

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a cart quantity. Any positive quantity is acceptable; whether
/// stock can fulfill it is a separate check.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a book title.
pub fn validate_title(title: &str) -> ValidationResult<()> {
    let title = title.trim();

    if title.is_empty() {
        return Err(ValidationError::Required {
            field: "title".to_string(),
        });
    }

    if title.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "title".to_string(),
            max: 255,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items), negative is not.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a shipping address label.
pub fn validate_shipping_address(address: &str) -> ValidationResult<()> {
    if address.trim().len() > 255 {
        return Err(ValidationError::TooLong {
            field: "shipping_address".to_string(),
            max: 255,
        });
    }

    Ok(())
}

/// Validates a UUID string.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}
