//! # Repository Module
//!
//! Database repository implementations for Tapas POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GUI action                                                            │
//! │       │  db.bills().find(&filter)                                      │
//! │       ▼                                                                 │
//! │  BillRepository                                                        │
//! │  ├── insert / update / delete                                          │
//! │  └── find / drain / find_by_customer                                   │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ConfigurationRepository`](configuration::ConfigurationRepository) - the configuration row
//! - [`CatalogRepository`](catalog::CatalogRepository) - categories and products
//! - [`BillRepository`](bill::BillRepository) - bills and bill lines

pub mod bill;
pub mod catalog;
pub mod configuration;
