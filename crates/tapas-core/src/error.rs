//! # Error Types
//!
//! Domain error types for tapas-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tapas-core errors (this file)                                         │
//! │  ├── CoreError        - Bill rule violations                           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tapas-db errors (separate crate)                                      │
//! │  └── DbError          - Database failures, wraps both of the above     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → GUI                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bill already holds the maximum number of lines.
    #[error("Bill cannot have more than {max} lines")]
    BillTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Unknown payment mode text read from storage or user input.
    #[error("Unknown payment mode: {0}")]
    UnknownPaymentMode(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before anything touches the database.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed e-mail).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Date range whose start is after its end.
    #[error("date range start {from} is after end {to}")]
    InvertedRange { from: String, to: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::QuantityTooLarge {
            requested: 1500,
            max: 999,
        };
        assert_eq!(
            err.to_string(),
            "Quantity 1500 exceeds maximum allowed (999)"
        );

        let err = CoreError::BillTooLarge { max: 200 };
        assert_eq!(err.to_string(), "Bill cannot have more than 200 lines");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "caption".to_string(),
        };
        assert_eq!(err.to_string(), "caption is required");

        let err = ValidationError::Negative {
            field: "price".to_string(),
        };
        assert_eq!(err.to_string(), "price must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "item".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
