//! # Domain Types
//!
//! Data the Tapas POS persists.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Configuration  │   │    Category     │   │      Bill       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  password       │   │  id             │   │  id             │       │
//! │  │  email          │   │  caption        │   │  customer       │       │
//! │  │  full_screen    │   │  icon           │   │  payment        │       │
//! │  │  ticket_*       │   │  products ──┐   │   │  sold_at        │       │
//! │  └─────────────────┘   └─────────────│───┘   │  lines ──┐      │       │
//! │                                      ▼       └──────────│──────┘       │
//! │                        ┌─────────────────┐   ┌──────────▼──────┐       │
//! │                        │    Product      │   │    BillLine     │       │
//! │                        │  caption, price │   │  qty, item, px  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ids are `None` until the database assigns them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{MAX_BILL_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Configuration
// =============================================================================

/// Terminal configuration. There is exactly one per database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Password guarding the back-office screens.
    pub password: Option<String>,

    /// Address end-of-day reports are mailed to.
    pub email: Option<String>,

    /// Run the GUI full screen.
    pub full_screen: bool,

    /// Align the category/product buttons automatically.
    pub auto_align: bool,

    /// Text printed above the bill lines.
    pub ticket_header: Option<String>,

    /// Text printed below the total.
    pub ticket_footer: Option<String>,

    /// Encoded logo image printed at the top of the ticket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_header_image: Option<Vec<u8>>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product sold from a category menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: Option<i64>,
    pub caption: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    /// Encoded button image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Vec<u8>>,
}

impl Product {
    pub fn new(caption: impl Into<String>, price_cents: i64) -> Self {
        Product {
            id: None,
            caption: caption.into(),
            description: None,
            price_cents,
            icon: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_icon(mut self, icon: Vec<u8>) -> Self {
        self.icon = Some(icon);
        self
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Builds a bill line selling `quantity` of this product at its current price.
    pub fn to_line(&self, quantity: i64) -> BillLine {
        BillLine::new(quantity, self.caption.clone(), self.price_cents)
    }
}

/// A top-level menu entry grouping products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: Option<i64>,
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Vec<u8>>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Category {
    pub fn new(caption: impl Into<String>) -> Self {
        Category {
            id: None,
            caption: caption.into(),
            icon: None,
            products: Vec::new(),
        }
    }

    pub fn with_icon(mut self, icon: Vec<u8>) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.push(product);
        self
    }

    /// Finds a product of this category by caption (exact match).
    pub fn product(&self, caption: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.caption == caption)
    }
}

// =============================================================================
// Payment Mode
// =============================================================================

/// How a bill was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Paid in cash at the counter.
    #[default]
    Cash,
    /// Paid by card on an external terminal.
    Card,
    /// Put on the customer's account, settled later.
    OnAccount,
}

impl PaymentMode {
    pub const ALL: [PaymentMode; 3] = [PaymentMode::Cash, PaymentMode::Card, PaymentMode::OnAccount];

    /// Text stored in the `payment` column.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::Card => "card",
            PaymentMode::OnAccount => "on_account",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PaymentMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::UnknownPaymentMode(s.to_string()))
    }
}

// =============================================================================
// Bill
// =============================================================================

/// One line of a bill.
///
/// Item caption and price are copied from the product when the line is
/// created so the ticket stays correct after the catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLine {
    pub quantity: i64,
    pub item: String,
    pub price_cents: i64,
}

impl BillLine {
    pub fn new(quantity: i64, item: impl Into<String>, price_cents: i64) -> Self {
        BillLine {
            quantity,
            item: item.into(),
            price_cents,
        }
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// quantity × unit price.
    #[inline]
    pub fn total(&self) -> Money {
        self.price().multiply_quantity(self.quantity)
    }
}

/// A sales receipt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bill {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub customer: Option<String>,
    pub payment: PaymentMode,
    /// Set by the database when the bill is first stored.
    #[serde(default)]
    pub sold_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lines: Vec<BillLine>,
}

impl Bill {
    pub fn new(payment: PaymentMode) -> Self {
        Bill {
            payment,
            ..Bill::default()
        }
    }

    pub fn for_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    /// Appends a line.
    ///
    /// ## Errors
    /// - `CoreError::BillTooLarge` when the bill already has `MAX_BILL_LINES` lines
    /// - `CoreError::QuantityTooLarge` when quantity exceeds `MAX_LINE_QUANTITY`
    pub fn add_line(&mut self, line: BillLine) -> CoreResult<()> {
        if self.lines.len() >= MAX_BILL_LINES {
            return Err(CoreError::BillTooLarge { max: MAX_BILL_LINES });
        }
        if line.quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: line.quantity,
                max: MAX_LINE_QUANTITY,
            });
        }
        self.lines.push(line);
        Ok(())
    }

    /// Sum of all line totals.
    pub fn total(&self) -> Money {
        self.lines.iter().map(BillLine::total).sum()
    }

    /// Number of items sold (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Bill Filter
// =============================================================================

/// Criteria for searching stored bills. Empty criteria match everything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillFilter {
    /// First day included.
    pub from: Option<NaiveDate>,
    /// Last day included.
    pub to: Option<NaiveDate>,
    /// Restrict to these payment modes; empty means any.
    #[serde(default)]
    pub payments: Vec<PaymentMode>,
}

impl BillFilter {
    pub fn new() -> Self {
        BillFilter::default()
    }

    pub fn since(mut self, day: NaiveDate) -> Self {
        self.from = Some(day);
        self
    }

    pub fn until(mut self, day: NaiveDate) -> Self {
        self.to = Some(day);
        self
    }

    pub fn on(self, day: NaiveDate) -> Self {
        self.since(day).until(day)
    }

    pub fn payment(mut self, mode: PaymentMode) -> Self {
        if !self.payments.contains(&mode) {
            self.payments.push(mode);
        }
        self
    }

    /// Lower bound as an instant: midnight UTC of `from`.
    pub fn start_instant(&self) -> Option<DateTime<Utc>> {
        self.from.map(|day| day.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    /// Exclusive upper bound as an instant: midnight UTC of the day after `to`.
    pub fn end_instant(&self) -> Option<DateTime<Utc>> {
        self.to
            .and_then(|day| day.succ_opt())
            .map(|next| next.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none() && self.payments.is_empty()
    }

    /// Rejects ranges whose start lies after their end.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(ValidationError::InvertedRange {
                from: from.to_string(),
                to: to.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bill_total() {
        let mut bill = Bill::new(PaymentMode::Card);
        bill.add_line(BillLine::new(3, "Croquetas", 150)).unwrap();
        bill.add_line(BillLine::new(2, "Vino tinto", 275)).unwrap();

        assert_eq!(bill.total().cents(), 1000);
        assert_eq!(bill.item_count(), 5);
    }

    #[test]
    fn test_empty_bill_total_is_zero() {
        assert!(Bill::new(PaymentMode::Cash).total().is_zero());
    }

    #[test]
    fn test_add_line_rejects_large_quantity() {
        let mut bill = Bill::new(PaymentMode::Cash);
        let err = bill
            .add_line(BillLine::new(MAX_LINE_QUANTITY + 1, "Caña", 200))
            .unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { .. }));
        assert!(bill.lines.is_empty());
    }

    #[test]
    fn test_add_line_rejects_too_many_lines() {
        let mut bill = Bill::new(PaymentMode::Cash);
        for _ in 0..MAX_BILL_LINES {
            bill.add_line(BillLine::new(1, "Aceitunas", 100)).unwrap();
        }
        let err = bill.add_line(BillLine::new(1, "Pan", 50)).unwrap_err();
        assert!(matches!(err, CoreError::BillTooLarge { max } if max == MAX_BILL_LINES));
    }

    #[test]
    fn test_payment_mode_text() {
        assert_eq!(PaymentMode::OnAccount.to_string(), "on_account");
        assert_eq!("CARD".parse::<PaymentMode>().unwrap(), PaymentMode::Card);
        assert_eq!(" cash ".parse::<PaymentMode>().unwrap(), PaymentMode::Cash);
        assert!("cheque".parse::<PaymentMode>().is_err());
        assert_eq!(PaymentMode::default(), PaymentMode::Cash);
    }

    #[test]
    fn test_payment_mode_serde_matches_column_text() {
        let json = serde_json::to_string(&PaymentMode::OnAccount).unwrap();
        assert_eq!(json, "\"on_account\"");
    }

    #[test]
    fn test_product_to_line_snapshots_price() {
        let product = Product::new("Tortilla", 380);
        let line = product.to_line(2);
        assert_eq!(line.item, "Tortilla");
        assert_eq!(line.total().cents(), 760);
    }

    #[test]
    fn test_category_lookup() {
        let category = Category::new("Bebidas")
            .with_product(Product::new("Caña", 200))
            .with_product(Product::new("Agua", 150));
        assert_eq!(category.product("Agua").map(|p| p.price_cents), Some(150));
        assert!(category.product("Cava").is_none());
    }

    #[test]
    fn test_filter_instants_cover_whole_days() {
        let filter = BillFilter::new().on(day(2026, 3, 14));

        let start = filter.start_instant().unwrap();
        let end = filter.end_instant().unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-14T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-03-15T00:00:00+00:00");
    }

    #[test]
    fn test_filter_validation() {
        assert!(BillFilter::new().validate().is_ok());
        assert!(BillFilter::new().on(day(2026, 1, 1)).validate().is_ok());

        let inverted = BillFilter::new().since(day(2026, 2, 1)).until(day(2026, 1, 1));
        assert!(matches!(
            inverted.validate(),
            Err(ValidationError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_filter_payment_dedup() {
        let filter = BillFilter::new()
            .payment(PaymentMode::Cash)
            .payment(PaymentMode::Cash)
            .payment(PaymentMode::Card);
        assert_eq!(filter.payments, vec![PaymentMode::Cash, PaymentMode::Card]);
        assert!(!filter.is_empty());
        assert!(BillFilter::new().is_empty());
    }

    #[test]
    fn test_configuration_default() {
        let config = Configuration::default();
        assert!(!config.full_screen);
        assert!(config.ticket_header_image.is_none());
    }
}
