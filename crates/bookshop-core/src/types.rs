//! # Domain Types
//!
//! Entities for the checkout workflow.
//!
//! ## Identity
//! Every entity carries a UUID v4 string id, generated by the storage layer
//! at insert time. IDs are immutable and used for all relations.
//!
//! ## Snapshot pattern
//! [`OrderItem`] freezes `book_title` and `price_cents` at purchase time.
//! They are plain values copied out of the book row inside the checkout
//! transaction and must never be recomputed from current catalog state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Caller identity
// =============================================================================

/// Role attached to every authenticated caller by the identity collaborator.
///
/// The checkout core trusts this value as already verified; it never issues
/// or validates credentials itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

// =============================================================================
// Book
// =============================================================================

/// A book in the catalog.
///
/// `stock_quantity` is the single piece of contended mutable state in the
/// system: checkout decrements it and admin edits replace it, always behind
/// the storage layer's atomic boundary. It never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Book {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Title shown in the catalog and frozen into order items.
    pub title: String,

    pub author: String,

    pub genre: String,

    /// Price in cents. Frozen into order items at purchase time.
    pub price_cents: i64,

    /// Optional cover image location; managed by the catalog collaborator,
    /// never touched by checkout.
    pub image_url: Option<String>,

    /// Units on hand. Never negative.
    pub stock_quantity: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether the requested quantity can currently be fulfilled.
    #[inline]
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One row of a user's cart: an unpurchased intent to buy.
///
/// A row is *active* while `order_id` is NULL. Checkout consumes rows by
/// stamping them with the new order's id rather than deleting them, which
/// keeps purchase history reconstructible.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartRow {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    /// Always > 0; enforced on add/update.
    pub quantity: i64,
    /// Set exactly once, by a successful checkout.
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CartRow {
    /// An active row has not been consumed by any order yet.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.order_id.is_none()
    }
}

/// A cart row joined with the live book it references.
///
/// This is what `get_active_cart` returns: the caller sees current price and
/// stock, and computes subtotals from them. Nothing here is frozen; freezing
/// happens only when checkout writes order items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLine {
    pub cart_row_id: String,
    pub book_id: String,
    pub title: String,
    pub author: String,
    /// Current catalog price in cents.
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Current stock, for availability display and the advisory check.
    pub stock_quantity: i64,
}

impl CartLine {
    /// Line subtotal at current catalog price.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// Computes the total over a set of cart lines at current prices.
pub fn cart_total(lines: &[CartLine]) -> Money {
    lines.iter().map(CartLine::subtotal).sum()
}

// =============================================================================
// Order
// =============================================================================

/// Status of an order.
///
/// A closed set of variants; transitions are admin-controlled overwrites
/// with no enforced transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, not yet handled.
    Pending,
    /// Fulfilled.
    Completed,
    /// Cancelled by an admin.
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// A finalized order.
///
/// Created atomically by the checkout engine; `user_id` is immutable after
/// creation and orders are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub shipping_address: String,
    /// Label only ("COD", "Card", ...). No charge is ever executed.
    pub payment_method: String,
}

/// A line item of an order.
///
/// `book_title` and `price_cents` are snapshots taken inside the checkout
/// transaction; later catalog edits must not change what this order reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub book_id: String,
    /// Title at purchase time (frozen).
    pub book_title: String,
    /// Always >= 1.
    pub quantity: i64,
    /// Unit price in cents at purchase time (frozen).
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Line total at the frozen price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price().multiply_quantity(self.quantity)
    }
}

/// An order together with its items, as read from the order store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    /// Order total, always derived from the stored snapshots.
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Builds the caller-facing snapshot view.
    pub fn to_snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            order_id: self.order.id.clone(),
            order_date: self.order.order_date,
            status: self.order.status,
            total_cents: self.total().cents(),
            items: self
                .items
                .iter()
                .map(|item| OrderLine {
                    book_id: item.book_id.clone(),
                    title: item.book_title.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.price_cents,
                })
                .collect(),
        }
    }
}

/// An order annotated with the owning user's display name, for admin listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderForAdmin {
    pub username: String,
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderForAdmin {
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

// =============================================================================
// Checkout response
// =============================================================================

/// The result of a successful checkout, built from the just-created rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub order_id: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    /// Sum of quantity x frozen unit price over all items.
    pub total_cents: i64,
    pub items: Vec<OrderLine>,
}

/// One line of an [`OrderSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub book_id: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}
