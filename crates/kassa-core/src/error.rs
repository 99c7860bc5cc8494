//! # Error Types
//!
//! Domain-specific error types for kassa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kassa-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Malformed aggregates rejected before writing   │
//! │                                                                         │
//! │  kassa-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures, wraps ValidationError        │
//! │                                                                         │
//! │  Flow: ValidationError → DbError → sync process                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A storage name did not match any known tax code.
    #[error("Unknown tax code: {0}")]
    UnknownTaxCode(String),

    /// A storage name did not match any known operation type.
    #[error("Unknown operation type: {0}")]
    UnknownOperationType(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Aggregate validation errors.
///
/// Raised before any SQL runs, so a malformed aggregate never opens a
/// transaction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A child row points at a different root than the one it is stored with.
    ///
    /// ## When This Occurs
    /// - A line copied from another sale without fixing `receipt_id`
    /// - A result built for another request
    #[error("{child} belongs to request {found}, expected {expected}")]
    ForeignChild {
        child: String,
        expected: i64,
        found: i64,
    },

    /// Two children of one aggregate share an id.
    #[error("Duplicate {field}: {value}")]
    Duplicate { field: String, value: i64 },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::ForeignChild {
            child: "line 5".to_string(),
            expected: 1,
            found: 2,
        };
        assert_eq!(err.to_string(), "line 5 belongs to request 2, expected 1");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Duplicate {
            field: "line id".to_string(),
            value: 3,
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
