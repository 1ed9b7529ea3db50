//! # Checkout Engine
//!
//! Turns a user's active cart into a persisted order with consistent
//! inventory accounting.
//!
//! ## Phases
//! ```text
//! Validating ──► Reserving ──► Committed   (success)
//!     │
//!     └────────► Aborted                   (failure, no side effects)
//! ```
//!
//! The advisory validation pass runs against a plain read and exists only to
//! fail fast with a good error. The *binding* stock check is the conditional
//! decrement inside the transaction:
//!
//! ```sql
//! UPDATE books SET stock_quantity = stock_quantity - ?q
//! WHERE id = ? AND stock_quantity >= ?q
//! ```
//!
//! Check and write are one statement, so two checkouts racing for the last
//! units of a book resolve first-committer-wins: the loser's update affects
//! zero rows and the whole phase aborts. Everything between `begin` and
//! `commit` is all-or-nothing; sqlx rolls the transaction back when it is
//! dropped on any early return.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, ShopError, ShopResult};
use crate::repository::cart::CartRepository;
use bookshop_core::{validation, CartLine, CoreError, Money, OrderLine, OrderSnapshot, OrderStatus};

/// Executes the validate-then-commit checkout protocol.
#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    pool: SqlitePool,
}

impl CheckoutEngine {
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutEngine { pool }
    }

    /// Checks out the user's active cart.
    ///
    /// On success the new order (status Pending) and its items exist, every
    /// touched book's stock is decremented, and the consumed cart rows carry
    /// the order id. On any failure the store is left exactly as it was.
    ///
    /// `shipping_address` and `payment_method` are recorded as labels; no
    /// charge is executed.
    pub async fn checkout(
        &self,
        user_id: &str,
        shipping_address: &str,
        payment_method: &str,
    ) -> ShopResult<OrderSnapshot> {
        validation::validate_shipping_address(shipping_address).map_err(CoreError::from)?;

        // Phase 1: snapshot read. No side effects on failure.
        let lines = CartRepository::new(self.pool.clone())
            .get_active_cart(user_id)
            .await?;

        // Phase 2: advisory validation. Fails fast before any mutation; the
        // binding stock check is repeated inside the transaction below.
        if let Err(err) = validate_lines(&lines) {
            debug!(user_id = %user_id, %err, "Checkout rejected before any write");
            return Err(err.into());
        }

        // Phase 3: atomic commit. Any early return drops the transaction,
        // which rolls back everything written so far.
        let mut tx = self.pool.begin().await.map_err(checkout_failed)?;

        let order_id = Uuid::new_v4().to_string();
        let order_date = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, order_date, status, shipping_address, payment_method)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&order_id)
        .bind(user_id)
        .bind(order_date)
        .bind(OrderStatus::Pending)
        .bind(shipping_address)
        .bind(payment_method)
        .execute(&mut *tx)
        .await
        .map_err(checkout_failed)?;

        let mut total = Money::zero();
        let mut items = Vec::with_capacity(lines.len());

        for line in &lines {
            // Binding re-check: decrement only if stock still suffices. A
            // concurrent checkout that got here first makes this affect
            // zero rows, and the whole phase aborts.
            let decremented = sqlx::query(
                r#"
                UPDATE books
                SET stock_quantity = stock_quantity - ?1, updated_at = ?2
                WHERE id = ?3 AND stock_quantity >= ?1
                "#,
            )
            .bind(line.quantity)
            .bind(order_date)
            .bind(&line.book_id)
            .execute(&mut *tx)
            .await
            .map_err(checkout_failed)?;

            if decremented.rows_affected() == 0 {
                debug!(
                    user_id = %user_id,
                    book_id = %line.book_id,
                    "Stock consumed by a concurrent checkout, aborting"
                );
                return Err(CoreError::insufficient_stock(&line.title).into());
            }

            // Snapshot title and price as read in this phase, under the
            // same isolation boundary as the decrement above.
            let (title, price_cents) = sqlx::query_as::<_, (String, i64)>(
                "SELECT title, price_cents FROM books WHERE id = ?1",
            )
            .bind(&line.book_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(checkout_failed)?;

            let item_id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, book_id, book_title, quantity, price_cents, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item_id)
            .bind(&order_id)
            .bind(&line.book_id)
            .bind(&title)
            .bind(line.quantity)
            .bind(price_cents)
            .bind(order_date)
            .execute(&mut *tx)
            .await
            .map_err(checkout_failed)?;

            // Consume the cart row. Zero rows means something else consumed
            // it mid-flight (e.g. a double submit); abort rather than sell
            // the same intent twice.
            let consumed = sqlx::query(
                "UPDATE cart_items SET order_id = ?1 WHERE id = ?2 AND order_id IS NULL",
            )
            .bind(&order_id)
            .bind(&line.cart_row_id)
            .execute(&mut *tx)
            .await
            .map_err(checkout_failed)?;

            if consumed.rows_affected() == 0 {
                return Err(ShopError::CheckoutFailed(DbError::not_found(
                    "Active cart row",
                    &line.cart_row_id,
                )));
            }

            total += Money::from_cents(price_cents).multiply_quantity(line.quantity);
            items.push(OrderLine {
                book_id: line.book_id.clone(),
                title,
                quantity: line.quantity,
                unit_price_cents: price_cents,
            });
        }

        tx.commit().await.map_err(checkout_failed)?;

        info!(
            user_id = %user_id,
            order_id = %order_id,
            total = %total,
            items = items.len(),
            "Checkout committed"
        );

        Ok(OrderSnapshot {
            order_id,
            order_date,
            status: OrderStatus::Pending,
            total_cents: total.cents(),
            items,
        })
    }
}

/// Wraps storage failures from inside the atomic phase.
fn checkout_failed(err: sqlx::Error) -> ShopError {
    ShopError::CheckoutFailed(DbError::from(err))
}

/// Advisory validation over a set of cart lines: rejects an empty cart and
/// any line whose quantity exceeds current stock. [`CheckoutEngine::checkout`]
/// runs this before opening its transaction; callers can also use it to
/// pre-flight a cart without committing.
pub fn validate_lines(lines: &[CartLine]) -> Result<(), CoreError> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    for line in lines {
        if line.stock_quantity < line.quantity {
            return Err(CoreError::insufficient_stock(&line.title));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::book::generate_book_id;
    use bookshop_core::Book;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_book(db: &Database, title: &str, price_cents: i64, stock: i64) -> String {
        let now = Utc::now();
        let book = Book {
            id: generate_book_id(),
            title: title.to_string(),
            author: "Author".to_string(),
            genre: "Fiction".to_string(),
            price_cents,
            image_url: None,
            stock_quantity: stock,
            created_at: now,
            updated_at: now,
        };
        db.books().insert(&book).await.unwrap();
        book.id
    }

    async fn stock_of(db: &Database, book_id: &str) -> i64 {
        db.books()
            .get_by_id(book_id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity
    }

    #[tokio::test]
    async fn test_checkout_success_scenario() {
        let db = test_db().await;
        let a = seed_book(&db, "A", 1000, 5).await;
        let b = seed_book(&db, "B", 500, 1).await;

        db.carts().add("u1", &a, 2).await.unwrap();
        db.carts().add("u1", &b, 1).await.unwrap();

        let snapshot = db
            .checkout()
            .checkout("u1", "12 High St", "COD")
            .await
            .unwrap();

        assert_eq!(snapshot.total_cents, 2500);
        assert_eq!(snapshot.status, OrderStatus::Pending);
        assert_eq!(snapshot.items.len(), 2);

        // Stock decremented.
        assert_eq!(stock_of(&db, &a).await, 3);
        assert_eq!(stock_of(&db, &b).await, 0);

        // Cart rows consumed, not deleted: the active cart is now empty...
        let lines = db.carts().get_active_cart("u1").await.unwrap();
        assert!(lines.is_empty());

        // ...and both rows carry the new order id.
        let consumed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cart_items WHERE user_id = 'u1' AND order_id = ?1",
        )
        .bind(&snapshot.order_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(consumed, 2);

        // The persisted order agrees with the snapshot.
        let order = db.orders().get_by_id(&snapshot.order_id).await.unwrap();
        assert_eq!(order.total().cents(), 2500);
        assert_eq!(order.order.shipping_address, "12 High St");
        assert_eq!(order.order.payment_method, "COD");
    }

    #[tokio::test]
    async fn test_empty_cart_fails_without_side_effects() {
        let db = test_db().await;
        seed_book(&db, "A", 1000, 5).await;

        let err = db
            .checkout()
            .checkout("u1", "addr", "COD")
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Domain(CoreError::EmptyCart)));

        let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orders, 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_aborts_everything() {
        let db = test_db().await;
        let a = seed_book(&db, "A", 1000, 5).await;
        let b = seed_book(&db, "B", 500, 1).await;

        db.carts().add("u1", &a, 2).await.unwrap();
        db.carts().add("u1", &b, 1).await.unwrap();

        // Stock of B evaporates after the rows were added (admin edit).
        db.books().adjust_stock(&b, -1).await.unwrap();

        let err = db
            .checkout()
            .checkout("u1", "addr", "COD")
            .await
            .unwrap_err();
        match err {
            ShopError::Domain(CoreError::InsufficientStock { title }) => {
                assert_eq!(title, "B")
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Nothing moved: A untouched, no order, no items, cart intact.
        assert_eq!(stock_of(&db, &a).await, 5);
        let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orders, 0);
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(items, 0);
        let lines = db.carts().get_active_cart("u1").await.unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_survives_catalog_edits() {
        let db = test_db().await;
        let a = seed_book(&db, "A", 1000, 5).await;

        db.carts().add("u1", &a, 2).await.unwrap();
        let snapshot = db.checkout().checkout("u1", "addr", "COD").await.unwrap();

        // Reprice and retitle the book after the order committed.
        let mut book = db.books().get_by_id(&a).await.unwrap().unwrap();
        book.title = "A (2nd edition)".to_string();
        book.price_cents = 9999;
        db.books().update(&book).await.unwrap();

        let order = db.orders().get_by_id(&snapshot.order_id).await.unwrap();
        assert_eq!(order.items[0].book_title, "A");
        assert_eq!(order.items[0].price_cents, 1000);
        assert_eq!(order.total().cents(), 2000);
    }

    #[tokio::test]
    async fn test_snapshot_response_shape() {
        let db = test_db().await;
        let a = seed_book(&db, "A", 1000, 5).await;
        db.carts().add("u1", &a, 1).await.unwrap();

        let snapshot = db.checkout().checkout("u1", "addr", "Card").await.unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();

        assert!(json["orderId"].is_string());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["totalCents"], 1000);
        assert_eq!(json["items"][0]["title"], "A");
        assert_eq!(json["items"][0]["quantity"], 1);
        assert_eq!(json["items"][0]["unitPriceCents"], 1000);
    }

    #[tokio::test]
    async fn test_two_users_race_for_last_unit() {
        // File-backed database so the two tasks get separate connections.
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("race.db"));
        let db = Database::new(config).await.unwrap();

        let c = seed_book(&db, "C", 750, 1).await;
        db.carts().add("u1", &c, 1).await.unwrap();
        db.carts().add("u2", &c, 1).await.unwrap();

        let db1 = db.clone();
        let db2 = db.clone();
        let c1 = c.clone();

        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { db1.checkout().checkout("u1", "addr", "COD").await }),
            tokio::spawn(async move { db2.checkout().checkout("u2", "addr", "COD").await }),
        );
        let r1 = r1.unwrap();
        let r2 = r2.unwrap();

        // Exactly one winner.
        assert_eq!(
            r1.is_ok() as u8 + r2.is_ok() as u8,
            1,
            "expected exactly one successful checkout, got {r1:?} / {r2:?}"
        );

        // The loser saw a clean, retryable rejection.
        let loser = if r1.is_err() { r1 } else { r2 };
        assert!(loser.unwrap_err().is_retryable());

        assert_eq!(stock_of(&db, &c1).await, 0);

        let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orders, 1);
    }

    #[test]
    fn test_validate_lines() {
        assert!(matches!(validate_lines(&[]), Err(CoreError::EmptyCart)));

        let line = CartLine {
            cart_row_id: "r".to_string(),
            book_id: "b".to_string(),
            title: "A".to_string(),
            author: "X".to_string(),
            unit_price_cents: 100,
            quantity: 2,
            stock_quantity: 1,
        };
        assert!(matches!(
            validate_lines(&[line]),
            Err(CoreError::InsufficientStock { .. })
        ));
    }
}
