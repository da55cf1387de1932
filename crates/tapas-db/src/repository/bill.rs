//! # Bill Repository
//!
//! Database operations for bills (sales receipts) and their lines.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bill Lifecycle                                    │
//! │                                                                         │
//! │  1. INSERT   insert() → header + lines in one transaction              │
//! │              id and sold_at assigned by the database                    │
//! │                                                                         │
//! │  2. CORRECT  update() → header rewritten, lines replaced               │
//! │              id and sold_at are kept                                    │
//! │                                                                         │
//! │  3. QUERY    find(filter) / find_by_customer(pattern) / get(id)        │
//! │                                                                         │
//! │  4. REMOVE   delete(id), or drain(filter) to read-and-purge a period   │
//! │              lines go with the header (ON DELETE CASCADE)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All search criteria are bound parameters; nothing user-supplied is ever
//! spliced into SQL text.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tapas_core::validation::{validate_bill, validate_customer_pattern};
use tapas_core::{Bill, BillFilter, BillLine, CoreError, PaymentMode, ValidationError, MAX_BILL_LINES};

/// Header columns plus one (optional) line, as produced by the bill join.
#[derive(Debug, FromRow)]
struct BillRow {
    bill_id: i64,
    customer: Option<String>,
    payment: PaymentMode,
    sold_at: DateTime<Utc>,
    quantity: Option<i64>,
    item: Option<String>,
    price_cents: Option<i64>,
}

impl BillRow {
    fn take_line(&mut self) -> Option<BillLine> {
        Some(BillLine {
            quantity: self.quantity?,
            item: self.item.take().unwrap_or_default(),
            price_cents: self.price_cents.unwrap_or_default(),
        })
    }
}

/// Folds join rows (ordered by bill id) into bills.
fn group_rows(rows: Vec<BillRow>) -> Vec<Bill> {
    let mut bills: Vec<Bill> = Vec::new();

    for mut row in rows {
        let line = row.take_line();

        if bills.last().map(|b| b.id) != Some(Some(row.bill_id)) {
            bills.push(Bill {
                id: Some(row.bill_id),
                customer: row.customer,
                payment: row.payment,
                sold_at: Some(row.sold_at),
                lines: Vec::new(),
            });
        }

        if let (Some(line), Some(bill)) = (line, bills.last_mut()) {
            bill.lines.push(line);
        }
    }

    bills
}

/// Starts the bill ⟕ line select. Callers append `AND ...` conditions.
fn select_bills<'args>() -> QueryBuilder<'args, Sqlite> {
    QueryBuilder::new(
        r#"
        SELECT
            b.id AS bill_id,
            b.customer,
            b.payment,
            b.sold_at,
            l.quantity,
            l.item,
            l.price_cents
        FROM bills b
        LEFT JOIN bill_lines l ON l.bill_id = b.id
        WHERE 1 = 1
        "#,
    )
}

/// Appends the filter criteria as bound conditions.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &BillFilter) {
    if let Some(start) = filter.start_instant() {
        qb.push(" AND b.sold_at >= ").push_bind(start);
    }

    if let Some(end) = filter.end_instant() {
        qb.push(" AND b.sold_at < ").push_bind(end);
    }

    if !filter.payments.is_empty() {
        qb.push(" AND b.payment IN (");
        let mut modes = qb.separated(", ");
        for mode in &filter.payments {
            modes.push_bind(*mode);
        }
        modes.push_unseparated(")");
    }
}

fn order_bills(qb: &mut QueryBuilder<'_, Sqlite>) {
    qb.push(" ORDER BY b.id, l.id");
}

/// Escapes LIKE wildcards so the pattern matches literally.
fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Checks a bill before it is written.
fn check_bill(bill: &Bill) -> DbResult<()> {
    if bill.lines.len() > MAX_BILL_LINES {
        return Err(CoreError::BillTooLarge { max: MAX_BILL_LINES }.into());
    }
    validate_bill(bill)?;
    Ok(())
}

async fn insert_lines(conn: &mut SqliteConnection, bill_id: i64, lines: &[BillLine]) -> DbResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO bill_lines (bill_id, quantity, item, price_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(bill_id)
        .bind(line.quantity)
        .bind(line.item.trim())
        .bind(line.price_cents)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Stores a new bill stamped with the current time.
    ///
    /// Any `id` or `sold_at` already on `bill` is ignored.
    pub async fn insert(&self, bill: &Bill) -> DbResult<Bill> {
        self.insert_at(bill, Utc::now()).await
    }

    /// Stores a new bill with an explicit sale time.
    ///
    /// Used when importing bills from another till or backfilling history.
    pub async fn insert_at(&self, bill: &Bill, sold_at: DateTime<Utc>) -> DbResult<Bill> {
        check_bill(bill)?;

        let total = bill.total();
        debug!(
            payment = %bill.payment,
            lines = bill.lines.len(),
            total = %total,
            "Inserting bill"
        );

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO bills (customer, payment, sold_at, total_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&bill.customer)
        .bind(bill.payment)
        .bind(sold_at)
        .bind(total.cents())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        insert_lines(&mut tx, id, &bill.lines).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(bill_id = id, "Bill stored");

        Ok(Bill {
            id: Some(id),
            sold_at: Some(sold_at),
            ..bill.clone()
        })
    }

    /// Rewrites a stored bill: customer, payment mode, total and all lines.
    ///
    /// The bill keeps its id and original sale time.
    ///
    /// ## Errors
    /// - `DbError::Validation` - `bill.id` is `None`
    /// - `DbError::NotFound` - no bill with that id
    pub async fn update(&self, bill: &Bill) -> DbResult<Bill> {
        let id = bill.id.ok_or_else(|| ValidationError::Required {
            field: "bill id".to_string(),
        })?;
        check_bill(bill)?;

        debug!(bill_id = id, lines = bill.lines.len(), "Updating bill");

        let mut tx = self.pool.begin().await?;

        let sold_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            UPDATE bills SET
                customer = ?2,
                payment = ?3,
                total_cents = ?4
            WHERE id = ?1
            RETURNING sold_at
            "#,
        )
        .bind(id)
        .bind(&bill.customer)
        .bind(bill.payment)
        .bind(bill.total().cents())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(sold_at) = sold_at else {
            return Err(DbError::not_found("Bill", id));
        };

        sqlx::query("DELETE FROM bill_lines WHERE bill_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_lines(&mut tx, id, &bill.lines).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(Bill {
            sold_at: Some(sold_at),
            ..bill.clone()
        })
    }

    /// Deletes a bill and its lines.
    ///
    /// ## Errors
    /// - `DbError::NotFound` - no bill with that id
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(bill_id = id, "Deleting bill");

        let result = sqlx::query("DELETE FROM bills WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill", id));
        }

        Ok(())
    }

    /// Gets a bill with its lines.
    pub async fn get(&self, id: i64) -> DbResult<Option<Bill>> {
        let mut qb = select_bills();
        qb.push(" AND b.id = ").push_bind(id);
        order_bills(&mut qb);

        let rows: Vec<BillRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(group_rows(rows).pop())
    }

    /// Finds bills matching `filter`, ordered by id.
    pub async fn find(&self, filter: &BillFilter) -> DbResult<Vec<Bill>> {
        filter.validate()?;

        let mut qb = select_bills();
        push_filter(&mut qb, filter);
        order_bills(&mut qb);

        let rows: Vec<BillRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let bills = group_rows(rows);

        debug!(?filter, count = bills.len(), "Found bills");
        Ok(bills)
    }

    /// Finds bills matching `filter` and deletes them in the same transaction.
    ///
    /// Returns exactly the bills that were removed.
    pub async fn drain(&self, filter: &BillFilter) -> DbResult<Vec<Bill>> {
        filter.validate()?;

        let mut tx = self.pool.begin().await?;

        let mut qb = select_bills();
        push_filter(&mut qb, filter);
        order_bills(&mut qb);
        let rows: Vec<BillRow> = qb.build_query_as().fetch_all(&mut *tx).await?;
        let bills = group_rows(rows);

        if !bills.is_empty() {
            // Delete by predicate; an id list would hit SQLite's bound-parameter limit
            let mut delete = QueryBuilder::<Sqlite>::new(
                "DELETE FROM bills WHERE id IN (SELECT b.id FROM bills b WHERE 1 = 1",
            );
            push_filter(&mut delete, filter);
            delete.push(")");

            let deleted = delete.build().execute(&mut *tx).await?.rows_affected();
            if deleted != bills.len() as u64 {
                return Err(DbError::TransactionFailed(format!(
                    "drain read {} bills but deleted {deleted}",
                    bills.len()
                )));
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(?filter, count = bills.len(), "Drained bills");
        Ok(bills)
    }

    /// Finds bills whose customer contains `pattern`.
    ///
    /// Matching uses SQLite `LIKE`, which folds case for ASCII letters only:
    /// `"mesa"` finds `"Mesa 1"`, but `"ÑA"` does not find `"Caña"`.
    /// `%`, `_` and `\` in the pattern match themselves. An empty pattern
    /// returns every bill.
    pub async fn find_by_customer(&self, pattern: &str) -> DbResult<Vec<Bill>> {
        let pattern = validate_customer_pattern(pattern)?;

        let mut qb = select_bills();
        if !pattern.is_empty() {
            qb.push(" AND b.customer LIKE '%' || ")
                .push_bind(escape_like(&pattern))
                .push(r" || '%' ESCAPE '\'");
        }
        order_bills(&mut qb);

        let rows: Vec<BillRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let bills = group_rows(rows);

        debug!(pattern = %pattern, count = bills.len(), "Found bills by customer");
        Ok(bills)
    }

    /// Counts stored bills.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("Mesa 4"), "Mesa 4");
        assert_eq!(escape_like("50%"), r"50\%");
        assert_eq!(escape_like("a_b"), r"a\_b");
        assert_eq!(escape_like(r"c:\x"), r"c:\\x");
    }

    #[test]
    fn test_group_rows_keeps_line_less_bills() {
        let at = Utc::now();
        let row = |bill_id: i64, item: Option<&str>| BillRow {
            bill_id,
            customer: None,
            payment: PaymentMode::Cash,
            sold_at: at,
            quantity: item.map(|_| 1),
            item: item.map(str::to_string),
            price_cents: item.map(|_| 100),
        };

        let bills = group_rows(vec![
            row(1, Some("Caña")),
            row(1, Some("Tapa")),
            row(2, None),
            row(3, Some("Café")),
        ]);

        assert_eq!(bills.len(), 3);
        assert_eq!(bills[0].lines.len(), 2);
        assert!(bills[1].lines.is_empty());
        assert_eq!(bills[2].lines[0].item, "Café");
    }
}
