//! # Order Repository (Order Store)
//!
//! Reads over finalized orders and their immutable line items, plus the
//! admin status overwrite. Orders are only ever *created* by the checkout
//! engine; nothing here inserts.
//!
//! Every total reported by this module is derived from the stored item
//! snapshots (`quantity x price_cents`), never from current book prices.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, ShopResult};
use bookshop_core::{CoreError, Order, OrderForAdmin, OrderItem, OrderStatus, OrderWithItems, Role};

/// Repository for order reads and status updates.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

const ORDER_COLUMNS: &str = "id, user_id, order_date, status, shipping_address, payment_method";

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order with its items, regardless of owner.
    pub async fn get_by_id(&self, order_id: &str) -> ShopResult<OrderWithItems> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

        let items = self.get_items(order_id).await?;

        Ok(OrderWithItems { order, items })
    }

    /// Gets an order on behalf of a caller. Customers only see their own
    /// orders; a foreign order id reads as not-found rather than leaking
    /// its existence. Admins see everything.
    pub async fn get_for_caller(
        &self,
        order_id: &str,
        user_id: &str,
        role: Role,
    ) -> ShopResult<OrderWithItems> {
        let order = self.get_by_id(order_id).await?;

        if order.order.user_id != user_id && !role.is_admin() {
            return Err(CoreError::OrderNotFound(order_id.to_string()).into());
        }

        Ok(order)
    }

    /// Lists a user's orders, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> ShopResult<Vec<OrderWithItems>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 ORDER BY order_date DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.get_items(&order.id).await?;
            result.push(OrderWithItems { order, items });
        }

        Ok(result)
    }

    /// Lists every order, newest first, each annotated with the owning
    /// user's display name. Privileged callers only; the identity
    /// collaborator is expected to have checked the Admin role.
    pub async fn list_all(&self) -> ShopResult<Vec<OrderForAdmin>> {
        let rows = sqlx::query_as::<_, AdminOrderRow>(
            r#"
            SELECT
                o.id, o.user_id, o.order_date, o.status,
                o.shipping_address, o.payment_method,
                COALESCE(u.username, o.user_id) AS username
            FROM orders o
            LEFT JOIN users u ON u.id = o.user_id
            ORDER BY o.order_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.get_items(&row.id).await?;
            result.push(OrderForAdmin {
                username: row.username,
                order: Order {
                    id: row.id,
                    user_id: row.user_id,
                    order_date: row.order_date,
                    status: row.status,
                    shipping_address: row.shipping_address,
                    payment_method: row.payment_method,
                },
                items,
            });
        }

        Ok(result)
    }

    /// Overwrites an order's status.
    ///
    /// Any variant-to-variant overwrite is allowed; there is deliberately
    /// no transition table at this layer.
    pub async fn set_status(&self, order_id: &str, status: OrderStatus) -> ShopResult<()> {
        debug!(order_id = %order_id, status = ?status, "Setting order status");

        let result = sqlx::query("UPDATE orders SET status = ?2 WHERE id = ?1")
            .bind(order_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::OrderNotFound(order_id.to_string()).into());
        }

        Ok(())
    }

    /// Gets the immutable line items of an order, in creation order.
    pub async fn get_items(&self, order_id: &str) -> ShopResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, book_id, book_title, quantity, price_cents, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(items)
    }
}

/// Flat row shape for the admin listing's username join.
#[derive(Debug, sqlx::FromRow)]
struct AdminOrderRow {
    id: String,
    user_id: String,
    order_date: chrono::DateTime<chrono::Utc>,
    status: OrderStatus,
    shipping_address: String,
    payment_method: String,
    username: String,
}
