//! # Book Repository (Catalog Store)
//!
//! CRUD and stock accounting for the catalog. Leaf dependency for the cart
//! store and the checkout engine.
//!
//! The checkout engine does NOT go through [`BookRepository::adjust_stock`]
//! for its decrements; it issues the same conditional-update shape inside
//! its own transaction so the check and the write stay indivisible with
//! respect to other checkouts.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, ShopResult};
use bookshop_core::{validation, Book, CoreError};

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

const BOOK_COLUMNS: &str =
    "id, title, author, genre, price_cents, image_url, stock_quantity, created_at, updated_at";

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BookRepository { pool }
    }

    /// Gets a book by ID.
    pub async fn get_by_id(&self, id: &str) -> ShopResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(book)
    }

    /// Lists the catalog ordered by title.
    pub async fn list(&self, limit: u32) -> ShopResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY title LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(books)
    }

    /// Inserts a new book. The caller builds the record with a generated id
    /// (see [`generate_book_id`]).
    pub async fn insert(&self, book: &Book) -> ShopResult<()> {
        validation::validate_title(&book.title).map_err(CoreError::from)?;
        validation::validate_price_cents(book.price_cents).map_err(CoreError::from)?;

        debug!(id = %book.id, title = %book.title, "Inserting book");

        sqlx::query(
            r#"
            INSERT INTO books (
                id, title, author, genre, price_cents,
                image_url, stock_quantity, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.price_cents)
        .bind(&book.image_url)
        .bind(book.stock_quantity)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(())
    }

    /// Updates title, author, genre, price, image and stock in one write.
    ///
    /// Admin catalog edits only; order item snapshots are unaffected by
    /// design.
    pub async fn update(&self, book: &Book) -> ShopResult<()> {
        validation::validate_title(&book.title).map_err(CoreError::from)?;
        validation::validate_price_cents(book.price_cents).map_err(CoreError::from)?;

        debug!(id = %book.id, "Updating book");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE books SET
                title = ?2,
                author = ?3,
                genre = ?4,
                price_cents = ?5,
                image_url = ?6,
                stock_quantity = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.price_cents)
        .bind(&book.image_url)
        .bind(book.stock_quantity)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::BookNotFound(book.id.clone()).into());
        }

        Ok(())
    }

    /// Adjusts stock by a delta (positive to restock, negative to remove
    /// units). The write is conditional so stock can never go negative,
    /// even under concurrent adjustments.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> ShopResult<()> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE books
            SET stock_quantity = stock_quantity + ?2, updated_at = ?3
            WHERE id = ?1 AND stock_quantity + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            // Either the book is gone or the delta would go below zero.
            return match self.get_by_id(id).await? {
                Some(book) => Err(CoreError::insufficient_stock(book.title).into()),
                None => Err(CoreError::BookNotFound(id.to_string()).into()),
            };
        }

        Ok(())
    }

    /// Deletes a book. Fails with a foreign key violation while any order
    /// item or cart row still references it (restrict-delete).
    pub async fn delete(&self, id: &str) -> ShopResult<()> {
        debug!(id = %id, "Deleting book");

        let result = sqlx::query("DELETE FROM books WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::BookNotFound(id.to_string()).into());
        }

        Ok(())
    }

    /// Counts catalog entries, for the seed tool.
    pub async fn count(&self) -> ShopResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(count)
    }
}

/// Helper to generate a new book ID.
pub fn generate_book_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::ShopError;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_book(title: &str, price_cents: i64, stock: i64) -> Book {
        let now = Utc::now();
        Book {
            id: generate_book_id(),
            title: title.to_string(),
            author: "Test Author".to_string(),
            genre: "Fiction".to_string(),
            price_cents,
            image_url: None,
            stock_quantity: stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let book = sample_book("The Hobbit", 1099, 4);

        db.books().insert(&book).await.unwrap();

        let fetched = db.books().get_by_id(&book.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "The Hobbit");
        assert_eq!(fetched.price().cents(), 1099);
        assert_eq!(fetched.stock_quantity, 4);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_price() {
        let db = test_db().await;
        let book = sample_book("Bad", -1, 0);

        let err = db.books().insert(&book).await.unwrap_err();
        assert!(matches!(
            err,
            ShopError::Domain(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_adjust_stock_never_negative() {
        let db = test_db().await;
        let book = sample_book("A", 1000, 2);
        db.books().insert(&book).await.unwrap();

        db.books().adjust_stock(&book.id, -2).await.unwrap();

        let err = db.books().adjust_stock(&book.id, -1).await.unwrap_err();
        assert!(matches!(
            err,
            ShopError::Domain(CoreError::InsufficientStock { .. })
        ));

        let fetched = db.books().get_by_id(&book.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock_quantity, 0);
    }

    #[tokio::test]
    async fn test_adjust_stock_unknown_book() {
        let db = test_db().await;
        let err = db.books().adjust_stock("missing", 5).await.unwrap_err();
        assert!(matches!(
            err,
            ShopError::Domain(CoreError::BookNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_book() {
        let db = test_db().await;
        let book = sample_book("Ghost", 100, 0);
        let err = db.books().update(&book).await.unwrap_err();
        assert!(matches!(
            err,
            ShopError::Domain(CoreError::BookNotFound(_))
        ));
    }
}
