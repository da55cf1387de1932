//! # tapas-core: Pure Domain Types for Tapas POS
//!
//! Everything the Tapas point-of-sale stores lives here as plain data:
//! terminal configuration, the category/product catalog and bills.
//! There is no I/O in this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tapas POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Point-of-sale GUI (outside this workspace)           │   │
//! │  │      Catalog menu ──► Bill lines ──► Pay ──► Print ticket       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tapas-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   error   │  │ validation│  │   │
//! │  │   │  Bill     │  │   Money   │  │ CoreError │  │   rules   │  │   │
//! │  │   │  Category │  │           │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tapas-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, DataProvider           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Configuration, Category, Product, Bill, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tapas_core::{Bill, BillLine, PaymentMode};
//!
//! let mut bill = Bill::new(PaymentMode::Cash);
//! bill.add_line(BillLine::new(2, "Patatas bravas", 450)).unwrap();
//! bill.add_line(BillLine::new(1, "Caña", 200)).unwrap();
//!
//! assert_eq!(bill.total().cents(), 1100);
//! assert_eq!(bill.total().to_string(), "11.00");
//! ```

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Maximum number of lines on a single bill.
pub const MAX_BILL_LINES: usize = 200;

/// Maximum quantity on a single bill line.
///
/// Catches slips like typing 100 instead of 10 at the till.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum unit price in cents (100 000.00).
///
/// Keeps `price × MAX_LINE_QUANTITY × MAX_BILL_LINES` far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000;

/// Maximum length of captions and customer names.
pub const MAX_CAPTION_LEN: usize = 100;
