//! # Cart Repository (Cart Store)
//!
//! Per-user mapping of book -> quantity, scoped to rows not yet consumed by
//! an order (`order_id IS NULL`).
//!
//! Stock checks here are advisory conveniences for the user: they validate
//! against *current* stock so an impossible cart is rejected early. The
//! binding check happens later, inside the checkout engine's transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, ShopResult};
use bookshop_core::{validation, Book, CartLine, CartRow, CoreError};

/// Repository for cart operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Returns the user's active cart rows joined with live book data, in
    /// insertion order. Subtotals and the cart total are computed by the
    /// caller from the returned lines (`CartLine::subtotal`, `cart_total`).
    pub async fn get_active_cart(&self, user_id: &str) -> ShopResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT
                ci.id AS cart_row_id,
                ci.book_id,
                b.title,
                b.author,
                b.price_cents AS unit_price_cents,
                ci.quantity,
                b.stock_quantity
            FROM cart_items ci
            INNER JOIN books b ON b.id = ci.book_id
            WHERE ci.user_id = ?1 AND ci.order_id IS NULL
            ORDER BY ci.created_at, ci.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(lines)
    }

    /// Adds a book to the user's cart.
    ///
    /// If an active row for (user, book) already exists, its quantity is
    /// incremented and the stock check runs against the *merged* total, so
    /// two valid adds cannot combine into an unfulfillable row.
    pub async fn add(&self, user_id: &str, book_id: &str, quantity: i64) -> ShopResult<CartRow> {
        validation::validate_quantity(quantity).map_err(|_| CoreError::InvalidQuantity)?;

        let book = self
            .fetch_book(book_id)
            .await?
            .ok_or_else(|| CoreError::BookNotFound(book_id.to_string()))?;

        let existing = self.find_active_row(user_id, book_id).await?;

        let new_total = existing.as_ref().map_or(0, |row| row.quantity) + quantity;
        if !book.has_stock_for(new_total) {
            return Err(CoreError::insufficient_stock(book.title).into());
        }

        match existing {
            Some(mut row) => {
                debug!(user_id = %user_id, book_id = %book_id, quantity = %new_total, "Merging cart row");

                sqlx::query(
                    "UPDATE cart_items SET quantity = ?2 WHERE id = ?1 AND order_id IS NULL",
                )
                .bind(&row.id)
                .bind(new_total)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?;

                row.quantity = new_total;
                Ok(row)
            }
            None => {
                let row = CartRow {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    book_id: book_id.to_string(),
                    quantity,
                    order_id: None,
                    created_at: Utc::now(),
                };

                debug!(user_id = %user_id, book_id = %book_id, quantity = %quantity, "Inserting cart row");

                sqlx::query(
                    r#"
                    INSERT INTO cart_items (id, user_id, book_id, quantity, order_id, created_at)
                    VALUES (?1, ?2, ?3, ?4, NULL, ?5)
                    "#,
                )
                .bind(&row.id)
                .bind(&row.user_id)
                .bind(&row.book_id)
                .bind(row.quantity)
                .bind(row.created_at)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?;

                Ok(row)
            }
        }
    }

    /// Sets the quantity of an active cart row owned by the user.
    pub async fn update(
        &self,
        user_id: &str,
        cart_row_id: &str,
        quantity: i64,
    ) -> ShopResult<()> {
        validation::validate_quantity(quantity).map_err(|_| CoreError::InvalidQuantity)?;

        let row = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT id, user_id, book_id, quantity, order_id, created_at
            FROM cart_items
            WHERE id = ?1 AND user_id = ?2 AND order_id IS NULL
            "#,
        )
        .bind(cart_row_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?
        .ok_or_else(|| CoreError::CartRowNotFound(cart_row_id.to_string()))?;

        let book = self
            .fetch_book(&row.book_id)
            .await?
            .ok_or_else(|| CoreError::BookNotFound(row.book_id.clone()))?;

        if !book.has_stock_for(quantity) {
            return Err(CoreError::insufficient_stock(book.title).into());
        }

        debug!(cart_row_id = %cart_row_id, quantity = %quantity, "Updating cart row");

        // Re-assert the row is still active: a checkout committing between
        // the read above and this write must not have its frozen quantity
        // rewritten.
        let result =
            sqlx::query("UPDATE cart_items SET quantity = ?2 WHERE id = ?1 AND order_id IS NULL")
                .bind(cart_row_id)
                .bind(quantity)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CartRowNotFound(cart_row_id.to_string()).into());
        }

        Ok(())
    }

    /// Removes one active cart row owned by the user.
    pub async fn remove(&self, user_id: &str, cart_row_id: &str) -> ShopResult<()> {
        let result = sqlx::query(
            "DELETE FROM cart_items WHERE id = ?1 AND user_id = ?2 AND order_id IS NULL",
        )
        .bind(cart_row_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CartRowNotFound(cart_row_id.to_string()).into());
        }

        Ok(())
    }

    /// Removes all of the user's active cart rows. A no-op on an already
    /// empty cart. Returns the number of rows removed.
    pub async fn clear(&self, user_id: &str) -> ShopResult<u64> {
        let result =
            sqlx::query("DELETE FROM cart_items WHERE user_id = ?1 AND order_id IS NULL")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?;

        debug!(user_id = %user_id, removed = result.rows_affected(), "Cart cleared");

        Ok(result.rows_affected())
    }

    async fn fetch_book(&self, book_id: &str) -> ShopResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, genre, price_cents, image_url,
                   stock_quantity, created_at, updated_at
            FROM books WHERE id = ?1
            "#,
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(book)
    }

    async fn find_active_row(&self, user_id: &str, book_id: &str) -> ShopResult<Option<CartRow>> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT id, user_id, book_id, quantity, order_id, created_at
            FROM cart_items
            WHERE user_id = ?1 AND book_id = ?2 AND order_id IS NULL
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(row)
    }
}
