//! # Catalog Repository
//!
//! Categories and the products they hold.
//!
//! ## Replace, Don't Patch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How the catalog is saved                             │
//! │                                                                         │
//! │  GUI edits the whole menu, then saves it in one go:                    │
//! │                                                                         │
//! │  ┌─────────────────── SINGLE TRANSACTION ───────────────────────────┐  │
//! │  │ 1. DELETE FROM categories        (products go via ON DELETE      │  │
//! │  │                                   CASCADE)                       │  │
//! │  │ 2. for each category:  INSERT → new id                           │  │
//! │  │       for each product: INSERT (category_id = new id)            │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT, or ROLLBACK leaving the previous menu untouched               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bills never reference products by id (lines copy caption and price), so
//! replacing the catalog never touches sales history.

use std::collections::HashSet;

use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use tapas_core::validation::validate_catalog;
use tapas_core::{Category, Product};

/// One row of the category ⟕ product join.
#[derive(Debug, FromRow)]
struct CatalogRow {
    category_id: i64,
    category_caption: String,
    category_icon: Option<Vec<u8>>,
    product_id: Option<i64>,
    product_caption: Option<String>,
    description: Option<String>,
    price_cents: Option<i64>,
    product_icon: Option<Vec<u8>>,
}

impl CatalogRow {
    /// Splits off the product half of the row, if the category had any.
    fn take_product(&mut self) -> Option<Product> {
        let id = self.product_id?;
        Some(Product {
            id: Some(id),
            caption: self.product_caption.take().unwrap_or_default(),
            description: self.description.take(),
            price_cents: self.price_cents.unwrap_or_default(),
            icon: self.product_icon.take().filter(|b| !b.is_empty()),
        })
    }
}

/// Folds join rows (ordered by category) into nested categories.
fn group_rows(rows: Vec<CatalogRow>) -> Vec<Category> {
    let mut categories: Vec<Category> = Vec::new();

    for mut row in rows {
        let product = row.take_product();

        let same_category = categories
            .last()
            .is_some_and(|c| c.id == Some(row.category_id));

        if !same_category {
            categories.push(Category {
                id: Some(row.category_id),
                caption: row.category_caption,
                icon: row.category_icon.filter(|b| !b.is_empty()),
                products: Vec::new(),
            });
        }

        if let (Some(product), Some(category)) = (product, categories.last_mut()) {
            category.products.push(product);
        }
    }

    categories
}

/// Repository for the category/product catalog.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Loads the whole catalog.
    ///
    /// Categories come in insertion order, products by caption. Categories
    /// without products are included with an empty list.
    pub async fn get_all(&self) -> DbResult<Vec<Category>> {
        let rows: Vec<CatalogRow> = sqlx::query_as(
            r#"
            SELECT
                c.id          AS category_id,
                c.caption     AS category_caption,
                c.icon        AS category_icon,
                p.id          AS product_id,
                p.caption     AS product_caption,
                p.description AS description,
                p.price_cents AS price_cents,
                p.icon        AS product_icon
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            ORDER BY c.id, p.caption, p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let categories = group_rows(rows);
        debug!(categories = categories.len(), "Loaded catalog");
        Ok(categories)
    }

    /// Replaces the stored catalog with `categories`.
    ///
    /// ## Returns
    /// The catalog as stored, with category and product ids assigned.
    ///
    /// ## Errors
    /// - `DbError::Validation` - blank caption or negative price
    /// - `DbError::UniqueViolation` - two categories share a caption
    pub async fn replace_all(&self, categories: &[Category]) -> DbResult<Vec<Category>> {
        validate_catalog(categories)?;

        let mut seen = HashSet::new();
        if let Some(dup) = categories.iter().find(|c| !seen.insert(c.caption.trim())) {
            return Err(DbError::duplicate("category caption", dup.caption.trim()));
        }

        let product_count: usize = categories.iter().map(|c| c.products.len()).sum();
        info!(
            categories = categories.len(),
            products = product_count,
            "Replacing catalog"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;

        let mut stored = Vec::with_capacity(categories.len());

        for category in categories {
            let category_id = sqlx::query("INSERT INTO categories (caption, icon) VALUES (?1, ?2)")
                .bind(category.caption.trim())
                .bind(&category.icon)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

            let mut products = Vec::with_capacity(category.products.len());

            for product in &category.products {
                let product_id = sqlx::query(
                    r#"
                    INSERT INTO products (category_id, caption, description, price_cents, icon)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(category_id)
                .bind(product.caption.trim())
                .bind(&product.description)
                .bind(product.price_cents)
                .bind(&product.icon)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

                products.push(Product {
                    id: Some(product_id),
                    caption: product.caption.trim().to_string(),
                    ..product.clone()
                });
            }

            stored.push(Category {
                id: Some(category_id),
                caption: category.caption.trim().to_string(),
                icon: category.icon.clone(),
                products,
            });
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(stored)
    }

    /// Counts `(categories, products)`.
    pub async fn counts(&self) -> DbResult<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM categories), (SELECT COUNT(*) FROM products)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}
