//! # Seed Data Generator
//!
//! Fills a database with a demo tapas menu and, optionally, demo bills.
//!
//! ## Usage
//! ```bash
//! # Demo menu into $TAPAS_DB_DIR/tapas.db (default ./db/tapas.db)
//! cargo run -p tapas-db --bin seed
//!
//! # Own catalog, plus 200 bills spread over the last 30 days
//! cargo run -p tapas-db --bin seed -- --catalog menu.json --bills 200
//!
//! # Specify database path
//! cargo run -p tapas-db --bin seed -- --db ./data/tapas.db
//! ```
//!
//! The catalog file is a JSON array of categories:
//! `[{"caption": "Bebidas", "products": [{"caption": "Caña", "price_cents": 200}]}]`

use chrono::{Duration, Utc};
use std::env;
use std::path::PathBuf;
use tapas_core::{Bill, Category, PaymentMode, Product};
use tapas_db::{DataProvider, Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Demo menu: (category, [(product, price in cents)])
const MENU: &[(&str, &[(&str, i64)])] = &[
    (
        "Bebidas",
        &[
            ("Caña", 200),
            ("Doble", 300),
            ("Vino tinto", 250),
            ("Vino blanco", 250),
            ("Vermut", 300),
            ("Agua", 150),
            ("Refresco", 220),
            ("Café", 130),
        ],
    ),
    (
        "Tapas",
        &[
            ("Patatas bravas", 450),
            ("Tortilla", 380),
            ("Croquetas", 600),
            ("Pimientos de Padrón", 550),
            ("Boquerones", 650),
            ("Aceitunas", 200),
        ],
    ),
    (
        "Raciones",
        &[
            ("Pulpo a la gallega", 1400),
            ("Calamares", 1100),
            ("Jamón ibérico", 1800),
            ("Queso manchego", 1000),
            ("Gambas al ajillo", 1250),
        ],
    ),
    (
        "Postres",
        &[("Flan", 350), ("Tarta de queso", 450), ("Crema catalana", 400)],
    ),
];

const CUSTOMERS: &[&str] = &["Mesa 1", "Mesa 2", "Mesa 5", "Barra", "Terraza 3", "Juan", "Lucía"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tapas=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut config = DbConfig::from_env();
    let mut catalog_file: Option<PathBuf> = None;
    let mut bill_count: usize = 0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--catalog" | "-c" => {
                if i + 1 < args.len() {
                    catalog_file = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--bills" | "-b" => {
                if i + 1 < args.len() {
                    bill_count = args[i + 1].parse().unwrap_or(0);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tapas POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: $TAPAS_DB_DIR/tapas.db)");
                println!("  -c, --catalog <FILE>   JSON catalog to load instead of the demo menu");
                println!("  -b, --bills <N>        Number of demo bills to insert (default: 0)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {other}"),
        }
        i += 1;
    }

    println!("🌱 Tapas POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::connect(config).await?;
    let (total, applied) = db.migration_status().await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied ({applied}/{total})");

    // Catalog
    let categories = match &catalog_file {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            let categories: Vec<Category> = serde_json::from_str(&json)?;
            println!("✓ Read catalog from {}", path.display());
            categories
        }
        None => demo_menu(),
    };

    let stored = db.replace_catalog(&categories).await?;
    let (category_count, product_count) = db.catalog_counts().await?;
    println!("✓ Catalog: {category_count} categories, {product_count} products");

    // Bills
    if bill_count > 0 {
        let products: Vec<&Product> = stored.iter().flat_map(|c| &c.products).collect();
        if products.is_empty() {
            println!("⚠ Catalog has no products, skipping bills");
        } else {
            let start = std::time::Instant::now();
            let now = Utc::now();

            for n in 0..bill_count {
                let bill = generate_bill(&products, n)?;
                // Spread over the last 30 days, newest last
                let age = Duration::minutes(((bill_count - n) * 30 * 24 * 60 / bill_count) as i64);
                db.bills().insert_at(&bill, now - age).await?;

                if (n + 1) % 100 == 0 {
                    println!("  Inserted {} bills...", n + 1);
                }
            }

            info!(bills = bill_count, elapsed = ?start.elapsed(), "Demo bills inserted");
        }
    }

    println!("✓ Bills: {}", db.count_bills().await?);
    println!();
    println!("✓ Seed complete!");

    DataProvider::close(&db).await;
    Ok(())
}

/// Builds the demo menu.
fn demo_menu() -> Vec<Category> {
    MENU.iter()
        .map(|(caption, products)| {
            products
                .iter()
                .fold(Category::new(*caption), |category, (name, price)| {
                    category.with_product(Product::new(*name, *price))
                })
        })
        .collect()
}

/// Builds the `n`-th demo bill: 1-5 lines picked deterministically.
fn generate_bill(products: &[&Product], n: usize) -> Result<Bill, tapas_core::CoreError> {
    let payment = PaymentMode::ALL[n % PaymentMode::ALL.len()];
    let mut bill = Bill::new(payment);

    if n % 3 != 0 {
        bill = bill.for_customer(CUSTOMERS[n % CUSTOMERS.len()]);
    }

    let lines = 1 + n % 5;
    for line in 0..lines {
        let product = products[(n * 7 + line * 13) % products.len()];
        let quantity = 1 + ((n + line) % 3) as i64;
        bill.add_line(product.to_line(quantity))?;
    }

    Ok(bill)
}
