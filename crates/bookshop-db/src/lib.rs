//! # bookshop-db: SQLite Storage Layer
//!
//! Everything that touches the database lives here: the connection pool,
//! embedded migrations, the three stores (catalog, cart, order) and the
//! checkout engine that ties them together in one atomic transaction.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bookshop_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("bookshop.db")).await?;
//!
//! db.carts().add(user_id, book_id, 2).await?;
//! let snapshot = db.checkout().checkout(user_id, address, "COD").await?;
//! ```
//!
//! ## Consistency model
//!
//! `books.stock_quantity` is the only contended mutable state. Every write
//! that can lose units is a conditional update (`... AND stock_quantity >=
//! needed`), and the checkout engine performs its check-and-decrement inside
//! a single transaction, so concurrent checkouts on the same book serialize
//! first-committer-wins and stock can never be oversold.

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use checkout::CheckoutEngine;
pub use error::{DbError, ShopError, ShopResult};
pub use pool::{Database, DbConfig};

pub use repository::book::BookRepository;
pub use repository::cart::CartRepository;
pub use repository::order::OrderRepository;
