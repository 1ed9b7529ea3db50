//! # bookshop-core: Pure Business Logic
//!
//! Domain types and rules for the bookshop checkout workflow. This crate is
//! deliberately I/O-free: no database, no network, no file system. The
//! storage layer (`bookshop-db`) depends on it, never the other way around.
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Book, CartRow, Order, OrderItem, ...)
//! - [`money`] - Integer-cent money type (no floating point)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output
//! 2. **Integer money**: every price and total is i64 cents
//! 3. **Typed errors**: enum variants, never strings or panics
//! 4. **Snapshots are values**: order items copy title/price at purchase
//!    time and never reference the live book record

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;
