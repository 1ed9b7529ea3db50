//! # Error Types
//!
//! Domain errors for bookshop-core.
//!
//! Every variant here is per-request and recoverable by the caller; none is
//! fatal to the process. Storage-level failures live in `bookshop-db`, which
//! wraps them together with these variants at the store-API seam.

use thiserror::Error;

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Nothing to check out. User-correctable, no retry needed.
    #[error("Cart is empty")]
    EmptyCart,

    /// Requested quantity exceeds the book's available stock.
    ///
    /// Raised by cart add/update against current stock, by the advisory
    /// pre-check, and by the binding re-check inside the atomic phase when a
    /// concurrent checkout consumed the stock first. Refresh the cart and
    /// retry.
    #[error("Not enough stock for '{title}'")]
    InsufficientStock { title: String },

    /// Referenced book does not exist.
    #[error("Book not found: {0}")]
    BookNotFound(String),

    /// Referenced cart row does not exist or is not owned by the caller.
    #[error("Cart row not found: {0}")]
    CartRowNotFound(String),

    /// Referenced order does not exist (or is not visible to the caller).
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Non-positive quantity supplied to add/update.
    #[error("Quantity must be greater than 0")]
    InvalidQuantity,

    /// Input validation failure.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InsufficientStock error for the given book title.
    pub fn insufficient_stock(title: impl Into<String>) -> Self {
        CoreError::InsufficientStock {
            title: title.into(),
        }
    }
}

/// Input validation errors, detected before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. not a UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Convenience alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
