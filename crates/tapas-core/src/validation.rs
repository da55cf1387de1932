//! # Validation Module
//!
//! Input checks run before anything is written to the database.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: GUI                                                          │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (called by tapas-db repositories)                │
//! │  ├── Captions, prices, quantities                                      │
//! │  └── E-mail, customer names                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE category caption                                           │
//! │  └── Foreign keys with ON DELETE CASCADE                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tapas_core::validation::{validate_caption, validate_quantity};
//!
//! validate_caption("product caption", "Pimientos de Padrón").unwrap();
//! validate_quantity(2).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{Bill, BillLine, Category, Configuration, Product};
use crate::{MAX_CAPTION_LEN, MAX_LINE_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// RFC 5321 path limit.
const MAX_EMAIL_LEN: usize = 254;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a caption shown on a menu button or ticket line.
///
/// ## Rules
/// - Not blank after trimming
/// - At most `MAX_CAPTION_LEN` characters
///
/// ```rust
/// use tapas_core::validation::validate_caption;
///
/// assert!(validate_caption("caption", "Gazpacho").is_ok());
/// assert!(validate_caption("caption", "   ").is_err());
/// ```
pub fn validate_caption(field: &str, caption: &str) -> ValidationResult<()> {
    let caption = caption.trim();

    if caption.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if caption.chars().count() > MAX_CAPTION_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CAPTION_LEN,
        });
    }

    Ok(())
}

/// Prices may be zero (free tapa with a drink) but never negative,
/// and at most `MAX_PRICE_CENTS`.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Quantity on a bill line: 1 ..= MAX_LINE_QUANTITY.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_LINE_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Loose e-mail check: one `@`, something on both sides, no spaces.
///
/// ```rust
/// use tapas_core::validation::validate_email;
///
/// assert!(validate_email("barra@example.com").is_ok());
/// assert!(validate_email("barra.example.com").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let email = email.trim();

    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LEN,
        });
    }

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            if domain.contains('@') {
                Err(invalid("must contain a single '@'"))
            } else {
                Ok(())
            }
        }
        _ => Err(invalid("expected local@domain")),
    }
}

/// Customer names are free text but bounded.
pub fn validate_customer(name: &str) -> ValidationResult<()> {
    if name.chars().count() > MAX_CAPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "customer".to_string(),
            max: MAX_CAPTION_LEN,
        });
    }
    Ok(())
}

/// Normalizes a customer search pattern.
///
/// Returns the trimmed pattern; an empty pattern is allowed and matches
/// every bill.
pub fn validate_customer_pattern(pattern: &str) -> ValidationResult<String> {
    let pattern = pattern.trim();

    if pattern.chars().count() > MAX_CAPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "customer pattern".to_string(),
            max: MAX_CAPTION_LEN,
        });
    }

    Ok(pattern.to_string())
}

// =============================================================================
// Aggregate Validators
// =============================================================================

pub fn validate_configuration(config: &Configuration) -> ValidationResult<()> {
    match config.email.as_deref() {
        Some(email) if !email.trim().is_empty() => validate_email(email),
        _ => Ok(()),
    }
}

pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_caption("product caption", &product.caption)?;
    validate_price_cents("product price", product.price_cents)
}

/// Validates a whole catalog: every category and product.
pub fn validate_catalog(categories: &[Category]) -> ValidationResult<()> {
    for category in categories {
        validate_caption("category caption", &category.caption)?;
        for product in &category.products {
            validate_product(product)?;
        }
    }
    Ok(())
}

pub fn validate_bill_line(line: &BillLine) -> ValidationResult<()> {
    validate_quantity(line.quantity)?;
    validate_caption("item", &line.item)?;
    validate_price_cents("price", line.price_cents)
}

/// Validates a bill before it is stored.
pub fn validate_bill(bill: &Bill) -> ValidationResult<()> {
    if let Some(customer) = bill.customer.as_deref() {
        validate_customer(customer)?;
    }
    bill.lines.iter().try_for_each(validate_bill_line)
}
