//! # tapas-db: Database Layer for Tapas POS
//!
//! Persistence for the point-of-sale: terminal configuration, the
//! category/product catalog and bills, kept in an embedded SQLite file.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tapas POS Data Flow                              │
//! │                                                                         │
//! │  GUI action (pay bill)                                                 │
//! │       │  provider.insert_bill(&bill)                                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tapas-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Configuration │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Catalog       │    │ 001_initial  │  │   │
//! │  │   │ DataProvider  │    │ Bill          │    │   _schema    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   $TAPAS_DB_DIR/tapas.db   (default ./db/tapas.db)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`provider`] - The `DataProvider` trait the application programs against
//! - [`repository`] - Repository implementations (configuration, catalog, bill)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tapas_db::{DataProvider, Database, DbConfig};
//!
//! let db = Database::connect(DbConfig::from_env()).await?;
//! let provider: &dyn DataProvider = &db;
//!
//! let menu = provider.catalog().await?;
//! let today = provider.find_bills(&BillFilter::new().on(day)).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod provider;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use provider::DataProvider;

pub use repository::bill::BillRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::configuration::ConfigurationRepository;
