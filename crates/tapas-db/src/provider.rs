//! # DataProvider
//!
//! The persistence interface the point-of-sale application programs
//! against. [`Database`] is the SQLite implementation; the GUI holds a
//! `Box<dyn DataProvider>` (or `Arc<dyn DataProvider>`) and never sees SQL.
//!
//! ```text
//! GUI ──► dyn DataProvider ──► Database ──► repositories ──► SQLite
//! ```

use async_trait::async_trait;

use crate::error::DbResult;
use crate::pool::Database;
use tapas_core::{Bill, BillFilter, Category, Configuration};

/// Storage for configuration, catalog and bills.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Loads the terminal configuration (defaults if never saved).
    async fn configuration(&self) -> DbResult<Configuration>;

    /// Saves the terminal configuration.
    async fn set_configuration(&self, config: &Configuration) -> DbResult<()>;

    /// Loads all categories with their products.
    async fn catalog(&self) -> DbResult<Vec<Category>>;

    /// Replaces the whole catalog; returns it with ids assigned.
    async fn replace_catalog(&self, categories: &[Category]) -> DbResult<Vec<Category>>;

    /// Stores a new bill; returns it with id and sale time set.
    async fn insert_bill(&self, bill: &Bill) -> DbResult<Bill>;

    /// Rewrites an already stored bill.
    async fn update_bill(&self, bill: &Bill) -> DbResult<Bill>;

    /// Removes a bill and its lines.
    async fn delete_bill(&self, id: i64) -> DbResult<()>;

    /// Loads one bill.
    async fn bill(&self, id: i64) -> DbResult<Option<Bill>>;

    /// Bills matching the filter.
    async fn find_bills(&self, filter: &BillFilter) -> DbResult<Vec<Bill>>;

    /// Bills matching the filter, deleted as they are returned.
    async fn drain_bills(&self, filter: &BillFilter) -> DbResult<Vec<Bill>>;

    /// Bills whose customer name contains `pattern`.
    async fn find_bills_by_customer(&self, pattern: &str) -> DbResult<Vec<Bill>>;

    /// `(categories, products)` currently stored.
    async fn catalog_counts(&self) -> DbResult<(i64, i64)>;

    /// Number of stored bills.
    async fn count_bills(&self) -> DbResult<i64>;

    /// Whether the storage answers queries.
    async fn health_check(&self) -> bool;

    /// Releases the underlying storage. Later calls fail.
    async fn close(&self);
}

#[async_trait]
impl DataProvider for Database {
    async fn configuration(&self) -> DbResult<Configuration> {
        Database::configuration(self).get().await
    }

    async fn set_configuration(&self, config: &Configuration) -> DbResult<()> {
        Database::configuration(self).set(config).await
    }

    async fn catalog(&self) -> DbResult<Vec<Category>> {
        Database::catalog(self).get_all().await
    }

    async fn replace_catalog(&self, categories: &[Category]) -> DbResult<Vec<Category>> {
        Database::catalog(self).replace_all(categories).await
    }

    async fn insert_bill(&self, bill: &Bill) -> DbResult<Bill> {
        self.bills().insert(bill).await
    }

    async fn update_bill(&self, bill: &Bill) -> DbResult<Bill> {
        self.bills().update(bill).await
    }

    async fn delete_bill(&self, id: i64) -> DbResult<()> {
        self.bills().delete(id).await
    }

    async fn bill(&self, id: i64) -> DbResult<Option<Bill>> {
        self.bills().get(id).await
    }

    async fn find_bills(&self, filter: &BillFilter) -> DbResult<Vec<Bill>> {
        self.bills().find(filter).await
    }

    async fn drain_bills(&self, filter: &BillFilter) -> DbResult<Vec<Bill>> {
        self.bills().drain(filter).await
    }

    async fn find_bills_by_customer(&self, pattern: &str) -> DbResult<Vec<Bill>> {
        self.bills().find_by_customer(pattern).await
    }

    async fn catalog_counts(&self) -> DbResult<(i64, i64)> {
        Database::catalog(self).counts().await
    }

    async fn count_bills(&self) -> DbResult<i64> {
        self.bills().count().await
    }

    async fn health_check(&self) -> bool {
        Database::health_check(self).await
    }

    async fn close(&self) {
        Database::close(self).await;
    }
}
