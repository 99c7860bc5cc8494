//! # Validation Module
//!
//! Structural checks run on every aggregate before it is written.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (no I/O)                                         │
//! │  ├── children point at their own root                                  │
//! │  └── line ids unique inside one sale                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── PRIMARY KEY constraints                                           │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use kassa_core::validation::validate_sale;
//!
//! validate_sale(&request)?;
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{CloseRequest, CorrectionRequest, OperationResult, SaleRequest};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a sale request and its lines.
///
/// ## Rules
/// - Every line must belong to this request
/// - Line ids must be unique within the request
/// - A result, when present, must belong to this request
pub fn validate_sale(request: &SaleRequest) -> ValidationResult<()> {
    let mut seen = HashSet::with_capacity(request.lines.len());
    for line in &request.lines {
        if line.receipt_id != request.id {
            return Err(ValidationError::ForeignChild {
                child: format!("line {}", line.id),
                expected: request.id,
                found: line.receipt_id,
            });
        }
        if !seen.insert(line.id) {
            return Err(ValidationError::Duplicate {
                field: "line id".to_string(),
                value: line.id,
            });
        }
    }

    validate_result(request.id, request.result.as_ref())
}

/// Validates a shift close request.
pub fn validate_close(request: &CloseRequest) -> ValidationResult<()> {
    validate_result(request.id, request.result.as_ref())
}

/// Validates a correction request.
///
/// Text fields are stored as given; NOT NULL is left to the schema.
pub fn validate_correction(request: &CorrectionRequest) -> ValidationResult<()> {
    validate_result(request.id, request.result.as_ref())
}

fn validate_result(root_id: i64, result: Option<&OperationResult>) -> ValidationResult<()> {
    match result {
        Some(result) if result.receipt_id != root_id => Err(ValidationError::ForeignChild {
            child: "result".to_string(),
            expected: root_id,
            found: result.receipt_id,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{status, Line, OperationType, TaxCode};
    use chrono::Utc;

    fn line(id: i64, receipt_id: i64) -> Line {
        Line {
            id,
            receipt_id,
            title: "Milk 1L".to_string(),
            quantity_milli: 2000,
            total_price_cents: 17800,
            price_cents: Some(8900),
            vat_rate: TaxCode::Ten,
            vat_amount_cents: Some(1618),
            created_at: None,
            updated_at: None,
            payment_case: 4,
        }
    }

    fn sale(id: i64, lines: Vec<Line>) -> SaleRequest {
        SaleRequest {
            id,
            account_id: 1,
            fiscal_copy: false,
            web_cashbox_id: Some(3),
            operation_type: OperationType::Sale,
            status: status::PENDING.to_string(),
            kkt_receipt_id: None,
            amount_cents: 17800,
            cash_amount_cents: 17800,
            electron_amount_cents: 0,
            prepaid_amount_cents: 0,
            postpaid_amount_cents: 0,
            counter_offer_amount_cents: 0,
            server_num: "b1c7".to_string(),
            cashier_name: Some("Ivanova".to_string()),
            email: None,
            phone_number: None,
            should_print: true,
            order_id: None,
            order_number: None,
            created_at: Some(Utc::now()),
            updated_at: None,
            archived_at: None,
            locked_previously: false,
            cashier_role: None,
            cashier_inn: None,
            transaction_address: None,
            lines,
            result: None,
        }
    }

    #[test]
    fn test_validate_sale() {
        assert!(validate_sale(&sale(10, vec![])).is_ok());
        assert!(validate_sale(&sale(10, vec![line(1, 10), line(2, 10)])).is_ok());

        let mut with_result = sale(10, vec![line(1, 10)]);
        with_result.result = Some(OperationResult::new(10));
        assert!(validate_sale(&with_result).is_ok());
    }

    #[test]
    fn test_foreign_line_rejected() {
        let err = validate_sale(&sale(10, vec![line(1, 10), line(2, 11)])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ForeignChild {
                child: "line 2".to_string(),
                expected: 10,
                found: 11,
            }
        );
    }

    #[test]
    fn test_duplicate_line_rejected() {
        let err = validate_sale(&sale(10, vec![line(1, 10), line(1, 10)])).unwrap_err();
        assert!(matches!(err, ValidationError::Duplicate { value: 1, .. }));
    }

    #[test]
    fn test_foreign_result_rejected() {
        let mut request = sale(10, vec![]);
        request.result = Some(OperationResult::new(99));
        assert!(matches!(
            validate_sale(&request),
            Err(ValidationError::ForeignChild { found: 99, .. })
        ));
    }

    #[test]
    fn test_blank_text_is_not_a_validation_concern() {
        let mut request = sale(10, vec![]);
        request.server_num = "  ".to_string();
        assert!(validate_sale(&request).is_ok());
    }

    #[test]
    fn test_validate_correction_checks_result_only() {
        let now = Utc::now();
        let mut request = CorrectionRequest {
            id: 5,
            operation_type: OperationType::CorrectionSale,
            amount_cents: 100,
            cash_amount_cents: 100,
            electron_amount_cents: 0,
            should_print: true,
            cashier_name: None,
            vat_rate: TaxCode::Eighteen,
            correction_description: None,
            correction_type: "self_correction".to_string(),
            document_number: Some("1".to_string()),
            document_date: Some(now),
            status: status::PENDING.to_string(),
            order_id: "10".to_string(),
            order_number: "10".to_string(),
            created_at: now,
            updated_at: now,
            archived_at: now,
            locked_previously: false,
            server_num: "a7".to_string(),
            result: None,
        };
        assert!(validate_correction(&request).is_ok());

        request.correction_type = String::new();
        request.server_num = String::new();
        assert!(validate_correction(&request).is_ok());

        request.result = Some(OperationResult::new(6));
        assert!(matches!(
            validate_correction(&request),
            Err(ValidationError::ForeignChild { expected: 5, found: 6, .. })
        ));
    }

    #[test]
    fn test_validate_close() {
        let mut request = CloseRequest {
            id: 3,
            account_id: 1,
            web_cashbox_id: None,
            status: None,
            should_print: false,
            created_at: None,
            updated_at: None,
            archived_at: None,
            locked_previously: false,
            server_num: "c1".to_string(),
            result: Some(OperationResult::new(3)),
        };
        assert!(validate_close(&request).is_ok());

        request.result = Some(OperationResult::new(4));
        assert!(validate_close(&request).is_err());
    }
}
