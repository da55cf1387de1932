//! End-to-end tests through the `DataProvider` trait.

use chrono::{DateTime, NaiveDate, Utc};
use tapas_core::{Bill, BillFilter, BillLine, Category, Configuration, PaymentMode, Product};
use tapas_db::{DataProvider, Database, DbConfig, DbError};
use tempfile::TempDir;

async fn provider() -> Box<dyn DataProvider> {
    Box::new(Database::connect(DbConfig::in_memory()).await.unwrap())
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn at(d: u32, hour: u32, min: u32) -> DateTime<Utc> {
    day(d).and_hms_opt(hour, min, 0).unwrap().and_utc()
}

fn bill(payment: PaymentMode, customer: Option<&str>, lines: &[(i64, &str, i64)]) -> Bill {
    let mut bill = Bill::new(payment);
    if let Some(customer) = customer {
        bill = bill.for_customer(customer);
    }
    for (qty, item, price) in lines {
        bill.add_line(BillLine::new(*qty, *item, *price)).unwrap();
    }
    bill
}

/// Stores bills on fixed dates: returns the database to keep it alive.
async fn march_bills() -> Database {
    let db = Database::connect(DbConfig::in_memory()).await.unwrap();
    let bills = db.bills();

    bills
        .insert_at(&bill(PaymentMode::Cash, Some("Mesa 1"), &[(2, "Caña", 200)]), at(1, 0, 0))
        .await
        .unwrap();
    bills
        .insert_at(&bill(PaymentMode::Card, Some("Juan"), &[(1, "Pulpo", 1400)]), at(1, 23, 59))
        .await
        .unwrap();
    bills
        .insert_at(&bill(PaymentMode::OnAccount, Some("Mesa 2"), &[(3, "Croquetas", 600)]), at(2, 12, 0))
        .await
        .unwrap();
    bills
        .insert_at(&bill(PaymentMode::Cash, None, &[(1, "Café", 130)]), at(3, 8, 30))
        .await
        .unwrap();

    db
}

fn customers(bills: &[Bill]) -> Vec<Option<&str>> {
    bills.iter().map(|b| b.customer.as_deref()).collect()
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn configuration_round_trip() {
    let provider = provider().await;
    assert_eq!(provider.configuration().await.unwrap(), Configuration::default());

    let config = Configuration {
        password: Some("0000".to_string()),
        email: Some("caja@bar.es".to_string()),
        full_screen: true,
        auto_align: false,
        ticket_header: Some("Casa Pepe".to_string()),
        ticket_footer: None,
        ticket_header_image: Some(vec![1, 2, 3, 4]),
    };
    provider.set_configuration(&config).await.unwrap();
    assert_eq!(provider.configuration().await.unwrap(), config);
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn catalog_replace_and_read() {
    let provider = provider().await;

    let menu = vec![
        Category::new("Tapas")
            .with_product(Product::new("Tortilla", 380))
            .with_product(Product::new("Bravas", 450).with_icon(vec![9, 9])),
        Category::new("Vacía"),
    ];
    let stored = provider.replace_catalog(&menu).await.unwrap();
    assert_eq!(stored.len(), 2);

    let catalog = provider.catalog().await.unwrap();
    assert_eq!(catalog, {
        // Read back sorts products by caption
        let mut expected = stored.clone();
        expected[0].products.sort_by(|a, b| a.caption.cmp(&b.caption));
        expected
    });
    assert_eq!(catalog[0].product("Bravas").unwrap().icon, Some(vec![9, 9]));
    assert_eq!(provider.catalog_counts().await.unwrap(), (2, 2));
}

#[tokio::test]
async fn catalog_replace_does_not_touch_bills() {
    let provider = provider().await;
    provider
        .replace_catalog(&[Category::new("Bebidas").with_product(Product::new("Caña", 200))])
        .await
        .unwrap();

    let stored = provider
        .insert_bill(&bill(PaymentMode::Cash, None, &[(1, "Caña", 200)]))
        .await
        .unwrap();

    provider.replace_catalog(&[]).await.unwrap();
    assert!(provider.catalog().await.unwrap().is_empty());

    let kept = provider.bill(stored.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(kept.lines[0].item, "Caña");
}

// =============================================================================
// Bills
// =============================================================================

#[tokio::test]
async fn insert_and_get_bill() {
    let provider = provider().await;
    let before = Utc::now();

    let new_bill = bill(
        PaymentMode::Card,
        Some("Mesa 4"),
        &[(2, "Patatas bravas", 450), (1, "Caña", 200), (1, "Caña", 200)],
    );
    let stored = provider.insert_bill(&new_bill).await.unwrap();

    let id = stored.id.unwrap();
    assert!(stored.sold_at.unwrap() >= before);
    assert_eq!(stored.total().cents(), 1300);

    let loaded = provider.bill(id).await.unwrap().unwrap();
    assert_eq!(loaded.customer.as_deref(), Some("Mesa 4"));
    assert_eq!(loaded.payment, PaymentMode::Card);
    assert_eq!(loaded.lines, new_bill.lines);
    assert_eq!(loaded.total().cents(), 1300);

    assert!(provider.bill(id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn bill_without_lines_is_kept() {
    let provider = provider().await;
    let stored = provider
        .insert_bill(&Bill::new(PaymentMode::Cash))
        .await
        .unwrap();

    let loaded = provider.bill(stored.id.unwrap()).await.unwrap().unwrap();
    assert!(loaded.lines.is_empty());
    assert_eq!(provider.find_bills(&BillFilter::new()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_bill_is_rejected() {
    let provider = provider().await;
    let mut bad = Bill::new(PaymentMode::Cash);
    bad.lines.push(BillLine::new(0, "Caña", 200));

    let err = provider.insert_bill(&bad).await.unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));
    assert_eq!(provider.count_bills().await.unwrap(), 0);
}

#[tokio::test]
async fn oversized_price_is_rejected_not_overflowed() {
    let provider = provider().await;
    let huge = bill(PaymentMode::Cash, None, &[(999, "Caro", i64::MAX / 100)]);

    let err = provider.insert_bill(&huge).await.unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));
    assert_eq!(provider.count_bills().await.unwrap(), 0);

    let err = provider
        .replace_catalog(&[Category::new("Caros").with_product(Product::new("Caro", i64::MAX))])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));

    let largest = bill(PaymentMode::Cash, None, &[(999, "Caro", tapas_core::MAX_PRICE_CENTS)]);
    let stored = provider.insert_bill(&largest).await.unwrap();
    assert_eq!(stored.total().cents(), 999 * tapas_core::MAX_PRICE_CENTS);
}

#[tokio::test]
async fn update_keeps_id_and_sale_time() {
    let db = march_bills().await;
    let provider: &dyn DataProvider = &db;

    let mut first = provider.bill(1).await.unwrap().unwrap();
    first.customer = Some("Mesa 7".to_string());
    first.payment = PaymentMode::Card;
    first.lines = vec![BillLine::new(1, "Vermut", 300)];

    let updated = provider.update_bill(&first).await.unwrap();
    assert_eq!(updated.id, Some(1));
    assert_eq!(updated.sold_at, Some(at(1, 0, 0)));

    let loaded = provider.bill(1).await.unwrap().unwrap();
    assert_eq!(loaded.customer.as_deref(), Some("Mesa 7"));
    assert_eq!(loaded.payment, PaymentMode::Card);
    assert_eq!(loaded.lines, vec![BillLine::new(1, "Vermut", 300)]);
    assert_eq!(loaded.sold_at, Some(at(1, 0, 0)));
    assert_eq!(provider.count_bills().await.unwrap(), 4);
}

#[tokio::test]
async fn update_requires_known_id() {
    let provider = provider().await;

    let unsaved = bill(PaymentMode::Cash, None, &[(1, "Caña", 200)]);
    let err = provider.update_bill(&unsaved).await.unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));

    let ghost = Bill {
        id: Some(42),
        ..unsaved
    };
    let err = provider.update_bill(&ghost).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
async fn delete_bill_removes_lines() {
    let db = march_bills().await;

    db.delete_bill(3).await.unwrap();
    assert!(db.bill(3).await.unwrap().is_none());
    assert_eq!(db.count_bills().await.unwrap(), 3);

    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bill_lines WHERE bill_id = 3")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(orphans, 0);

    let err = db.delete_bill(3).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

// =============================================================================
// Finding bills
// =============================================================================

#[tokio::test]
async fn find_by_single_day_covers_whole_day() {
    let db = march_bills().await;

    let found = db.find_bills(&BillFilter::new().on(day(1))).await.unwrap();
    assert_eq!(customers(&found), [Some("Mesa 1"), Some("Juan")]);

    let found = db.find_bills(&BillFilter::new().on(day(4))).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn find_by_open_ranges() {
    let db = march_bills().await;

    let since = db.find_bills(&BillFilter::new().since(day(2))).await.unwrap();
    assert_eq!(customers(&since), [Some("Mesa 2"), None]);

    let until = db.find_bills(&BillFilter::new().until(day(2))).await.unwrap();
    assert_eq!(until.len(), 3);

    let all = db.find_bills(&BillFilter::new()).await.unwrap();
    assert_eq!(all.iter().map(|b| b.id.unwrap()).collect::<Vec<_>>(), [1, 2, 3, 4]);
}

#[tokio::test]
async fn find_by_payment_mode() {
    let db = march_bills().await;

    let cash = db
        .find_bills(&BillFilter::new().payment(PaymentMode::Cash))
        .await
        .unwrap();
    assert_eq!(cash.len(), 2);
    assert!(cash.iter().all(|b| b.payment == PaymentMode::Cash));

    let cash_or_card = db
        .find_bills(
            &BillFilter::new()
                .on(day(1))
                .payment(PaymentMode::Cash)
                .payment(PaymentMode::Card),
        )
        .await
        .unwrap();
    assert_eq!(cash_or_card.len(), 2);
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let db = march_bills().await;
    let err = db
        .find_bills(&BillFilter::new().since(day(3)).until(day(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Validation(_)));
}

#[tokio::test]
async fn drain_returns_and_deletes() {
    let db = march_bills().await;

    let drained = db.drain_bills(&BillFilter::new().on(day(1))).await.unwrap();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].lines[0].item, "Caña");

    assert_eq!(db.count_bills().await.unwrap(), 2);
    assert!(db.find_bills(&BillFilter::new().on(day(1))).await.unwrap().is_empty());

    // Nothing left to drain
    assert!(db.drain_bills(&BillFilter::new().on(day(1))).await.unwrap().is_empty());
}

#[tokio::test]
async fn drain_handles_periods_larger_than_parameter_limit() {
    // SQLite allows at most 32766 bound parameters per statement
    const BILLS: i64 = 33_000;

    let db = Database::connect(DbConfig::in_memory()).await.unwrap();
    sqlx::query(
        r#"
        WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < ?1)
        INSERT INTO bills (customer, payment, sold_at, total_cents)
        SELECT NULL, 'cash', ?2, 0 FROM n
        "#,
    )
    .bind(BILLS)
    .bind(at(1, 12, 0))
    .execute(db.pool())
    .await
    .unwrap();
    db.insert_bill(&bill(PaymentMode::Card, None, &[(1, "Caña", 200)]))
        .await
        .unwrap();

    let filter = BillFilter::new().on(day(1));
    assert_eq!(db.find_bills(&filter).await.unwrap().len(), BILLS as usize);

    let drained = db.drain_bills(&filter).await.unwrap();
    assert_eq!(drained.len(), BILLS as usize);

    assert!(db.find_bills(&filter).await.unwrap().is_empty());
    assert_eq!(db.count_bills().await.unwrap(), 1);
}

#[tokio::test]
async fn find_by_customer_substring() {
    let db = march_bills().await;

    let found = db.find_bills_by_customer("mesa").await.unwrap();
    assert_eq!(customers(&found), [Some("Mesa 1"), Some("Mesa 2")]);

    let found = db.find_bills_by_customer("  UAN ").await.unwrap();
    assert_eq!(customers(&found), [Some("Juan")]);

    assert_eq!(db.find_bills_by_customer("").await.unwrap().len(), 4);
    assert!(db.find_bills_by_customer("nadie").await.unwrap().is_empty());
}

#[tokio::test]
async fn find_by_customer_matches_wildcards_literally() {
    let provider = provider().await;
    for customer in ["Mesa_1", "Mesa 1", "50% off", "500 off"] {
        provider
            .insert_bill(&bill(PaymentMode::Cash, Some(customer), &[(1, "Caña", 200)]))
            .await
            .unwrap();
    }

    let found = provider.find_bills_by_customer("_").await.unwrap();
    assert_eq!(customers(&found), [Some("Mesa_1")]);

    let found = provider.find_bills_by_customer("0%").await.unwrap();
    assert_eq!(customers(&found), [Some("50% off")]);
}

#[tokio::test]
async fn find_by_customer_folds_ascii_case_only() {
    let provider = provider().await;
    provider
        .insert_bill(&bill(PaymentMode::Cash, Some("Caña Mesa"), &[(1, "Caña", 200)]))
        .await
        .unwrap();

    assert_eq!(provider.find_bills_by_customer("CAñA").await.unwrap().len(), 1);
    assert!(provider.find_bills_by_customer("CAÑA").await.unwrap().is_empty());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn operations_fail_after_close() {
    let provider = provider().await;
    assert!(provider.health_check().await);

    provider.close().await;

    assert!(!provider.health_check().await);
    let err = provider.configuration().await.unwrap_err();
    assert!(matches!(err, DbError::ConnectionFailed(_)));
}

#[tokio::test]
async fn file_database_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let config = DbConfig::in_dir(dir.path().join("db"));
    assert_eq!(config.database_path, dir.path().join("db").join("tapas.db"));

    let db = Database::connect(config.clone()).await.unwrap();
    assert!(config.database_path.exists());

    db.replace_catalog(&[Category::new("Bebidas").with_product(Product::new("Caña", 200))])
        .await
        .unwrap();
    db.insert_bill(&bill(PaymentMode::Card, Some("Mesa 3"), &[(4, "Caña", 200)]))
        .await
        .unwrap();
    DataProvider::close(&db).await;

    let reopened = Database::connect(config).await.unwrap();
    assert_eq!(reopened.catalog_counts().await.unwrap(), (1, 1));

    let bills = reopened.find_bills(&BillFilter::new()).await.unwrap();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].total().cents(), 800);

    let (total, applied) = reopened.migration_status().await.unwrap();
    assert_eq!(total, applied);
}

#[tokio::test]
async fn read_only_directory_is_rejected() {
    let dir = TempDir::new().unwrap();
    let locked = dir.path().join("locked");
    std::fs::create_dir(&locked).unwrap();

    let original = std::fs::metadata(&locked).unwrap().permissions();
    let mut read_only = original.clone();
    read_only.set_readonly(true);
    std::fs::set_permissions(&locked, read_only).unwrap();

    let result = Database::connect(DbConfig::in_dir(&locked)).await;

    std::fs::set_permissions(&locked, original).unwrap();

    assert!(matches!(result, Err(DbError::ConnectionFailed(_))));
    assert!(!locked.join("tapas.db").exists());
}
