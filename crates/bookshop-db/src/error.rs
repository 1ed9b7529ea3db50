//! # Storage Error Types
//!
//! Two layers of errors live here:
//!
//! - [`DbError`]: low-level database failures, mapped from `sqlx::Error`
//!   with constraint classification.
//! - [`ShopError`]: what the store APIs (cart, orders, checkout) return.
//!   It carries the domain error kinds from `bookshop-core` alongside
//!   storage failures, so callers can match on a machine-checkable kind
//!   without parsing messages.

use thiserror::Error;

use bookshop_core::CoreError;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in the database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (e.g. duplicate active cart row).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation. Deleting a book that still has
    /// order history surfaces as this.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Maps sqlx errors onto [`DbError`], classifying SQLite constraint
/// messages so callers see a typed violation instead of a raw string.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for low-level database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Store-API error
// =============================================================================

/// Errors returned by the cart, order and checkout store APIs.
///
/// `CheckoutFailed` is reserved for storage failures *inside* the atomic
/// phase; by the time the caller sees it the transaction has been rolled
/// back in full, so retrying after refreshing cart state is always safe.
#[derive(Debug, Error)]
pub enum ShopError {
    /// A business rule rejected the request before any mutation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The atomic checkout phase hit a storage failure and was rolled back.
    #[error("Checkout failed: {0}")]
    CheckoutFailed(#[source] DbError),

    /// Storage failure outside the atomic phase.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl ShopError {
    /// True when refreshing cart/stock state and retrying may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::CheckoutFailed(_)
                | ShopError::Domain(CoreError::InsufficientStock { .. })
        )
    }
}

/// Result type for store-API operations.
pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_failed_is_retryable() {
        let err = ShopError::CheckoutFailed(DbError::QueryFailed("disk I/O".to_string()));
        assert!(err.is_retryable());

        let err = ShopError::Domain(CoreError::insufficient_stock("B"));
        assert!(err.is_retryable());

        let err = ShopError::Domain(CoreError::EmptyCart);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_found_message() {
        let err = DbError::not_found("Order", "abc");
        assert_eq!(err.to_string(), "Order not found: abc");
    }
}
