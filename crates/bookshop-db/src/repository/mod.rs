//! # Repositories
//!
//! One repository per store, each a thin handle over the shared pool:
//!
//! - [`book::BookRepository`] - catalog CRUD and stock accounting
//! - [`cart::CartRepository`] - active cart rows and merges
//! - [`order::OrderRepository`] - order reads and status updates
//!
//! Order *creation* is deliberately absent here; only the checkout engine
//! writes orders, inside its atomic transaction.

pub mod book;
pub mod cart;
pub mod order;
