//! # Domain Types
//!
//! Operation requests persisted by the fiscal box and replayed to the backend
//! by the sync process.
//!
//! ## Aggregate Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Operation Aggregates                            │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │   SaleRequest    │   │   CloseRequest   │   │CorrectionRequest │    │
//! │  │  ──────────────  │   │  ──────────────  │   │  ──────────────  │    │
//! │  │  id (upstream)   │   │  id (upstream)   │   │  id (upstream)   │    │
//! │  │  lines: Vec<Line>│   │  shift metadata  │   │  vat_rate        │    │
//! │  │  result?         │   │  result?         │   │  result?         │    │
//! │  └──────────────────┘   └──────────────────┘   └──────────────────┘    │
//! │                                                                         │
//! │  OperationResult        - finalized backend response, keyed by root id │
//! │  OperationRequestError  - recorded sync failure, one table for all     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Root ids are assigned by the upstream system and are never generated here.
//! Amounts are integers in minor currency units (kopecks).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

// =============================================================================
// Request Status
// =============================================================================

/// Status strings written by the printing side and read by the sync side.
///
/// Status is free text in storage; only these two values carry meaning for
/// the store's queries.
pub mod status {
    /// The request has not been printed yet.
    pub const PENDING: &str = "pending";
    /// The receipt was printed.
    pub const PRINTED: &str = "printed";
}

// =============================================================================
// Tax Code
// =============================================================================

/// VAT rate applied to a line or a correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxCode {
    Zero,
    Ten,
    Eighteen,
    Twenty,
    /// Not subject to VAT.
    NoVat,
}

impl TaxCode {
    pub const ALL: [TaxCode; 5] = [
        TaxCode::Zero,
        TaxCode::Ten,
        TaxCode::Eighteen,
        TaxCode::Twenty,
        TaxCode::NoVat,
    ];

    /// Percentage value used by the backend API (`None` for no VAT).
    pub const fn backend_value(&self) -> Option<u8> {
        match self {
            TaxCode::Zero => Some(0),
            TaxCode::Ten => Some(10),
            TaxCode::Eighteen => Some(18),
            TaxCode::Twenty => Some(20),
            TaxCode::NoVat => None,
        }
    }

    /// Tax type id expected by the fiscal register.
    ///
    /// 18% and 20% share an id: the register treats them as one "standard
    /// rate" slot.
    pub const fn tax_type_id(&self) -> u8 {
        match self {
            TaxCode::Zero => 1,
            TaxCode::Ten => 2,
            TaxCode::Eighteen | TaxCode::Twenty => 3,
            TaxCode::NoVat => 4,
        }
    }

    /// Storage name (matches the serde representation).
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaxCode::Zero => "zero",
            TaxCode::Ten => "ten",
            TaxCode::Eighteen => "eighteen",
            TaxCode::Twenty => "twenty",
            TaxCode::NoVat => "no_vat",
        }
    }

    /// Finds the tax code for a backend percentage value.
    pub fn from_backend_value(value: Option<u8>) -> Option<TaxCode> {
        Self::ALL
            .into_iter()
            .find(|code| code.backend_value() == value)
    }
}

impl std::fmt::Display for TaxCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| CoreError::UnknownTaxCode(s.to_string()))
    }
}

// =============================================================================
// Operation Type
// =============================================================================

/// Kind of fiscal operation a request asks the register to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Sale,
    Return,
    ShiftClose,
    CorrectionSale,
    CorrectionRefund,
}

impl OperationType {
    pub const ALL: [OperationType; 5] = [
        OperationType::Sale,
        OperationType::Return,
        OperationType::ShiftClose,
        OperationType::CorrectionSale,
        OperationType::CorrectionRefund,
    ];

    /// Operation name in backend requests.
    pub const fn backend_request_name(&self) -> &'static str {
        match self {
            OperationType::Sale => "op_1",
            OperationType::Return => "op_2",
            OperationType::ShiftClose => "op_3",
            OperationType::CorrectionSale => "op_4",
            OperationType::CorrectionRefund => "op_5",
        }
    }

    /// Path segment used by the box HTTP API.
    pub const fn box_url(&self) -> &'static str {
        match self {
            OperationType::Sale => "1",
            OperationType::Return => "2",
            OperationType::ShiftClose => "3",
            OperationType::CorrectionSale => "4",
            OperationType::CorrectionRefund => "5",
        }
    }

    /// Document type name printed by the register.
    pub const fn type_name(&self) -> &'static str {
        match self {
            OperationType::Sale => "Sale",
            OperationType::Return => "Return",
            OperationType::ShiftClose => "CloseReta",
            OperationType::CorrectionSale => "SaleCor",
            OperationType::CorrectionRefund => "ReturnCor",
        }
    }

    /// Storage name (matches the serde representation).
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationType::Sale => "sale",
            OperationType::Return => "return",
            OperationType::ShiftClose => "shift_close",
            OperationType::CorrectionSale => "correction_sale",
            OperationType::CorrectionRefund => "correction_refund",
        }
    }

    pub fn find_by_box_url(box_url: &str) -> Option<OperationType> {
        Self::ALL.into_iter().find(|t| t.box_url() == box_url)
    }

    pub fn find_by_type_name(type_name: &str) -> Option<OperationType> {
        Self::ALL.into_iter().find(|t| t.type_name() == type_name)
    }

    pub fn find_by_backend_request_name(name: &str) -> Option<OperationType> {
        Self::ALL
            .into_iter()
            .find(|t| t.backend_request_name() == name)
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CoreError::UnknownOperationType(s.to_string()))
    }
}

// =============================================================================
// Operation Result
// =============================================================================

/// Finalized backend response for one operation request.
///
/// Keyed by the request id; at most one exists per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationResult {
    pub receipt_id: i64,
}

impl OperationResult {
    pub fn new(receipt_id: i64) -> Self {
        OperationResult { receipt_id }
    }
}

// =============================================================================
// Operation Request Error
// =============================================================================

/// A failed synchronization attempt for some request.
///
/// Stored in one table shared by every request kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequestError {
    /// Id of the request that failed (sale, close or correction).
    pub receipt_request_id: i64,
    pub error_code: i32,
    pub error_description: String,
    /// Whether the sync process may retry the request.
    pub recoverable: bool,
}

// =============================================================================
// Line
// =============================================================================

/// A receipt line of a sale request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub id: i64,
    /// Owning sale request.
    pub receipt_id: i64,
    pub title: String,
    /// Quantity in thousandths (1500 = 1.5 units).
    pub quantity_milli: i64,
    pub total_price_cents: i64,
    pub price_cents: Option<i64>,
    pub vat_rate: TaxCode,
    pub vat_amount_cents: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub payment_case: i32,
}

// =============================================================================
// Sale Request
// =============================================================================

/// A sale (or return) receipt waiting to be printed and synchronized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRequest {
    pub id: i64,
    pub account_id: i64,
    /// Request to print a fiscal copy of an already printed receipt.
    pub fiscal_copy: bool,
    pub web_cashbox_id: Option<i64>,
    pub operation_type: OperationType,
    pub status: String,
    pub kkt_receipt_id: Option<i64>,
    pub amount_cents: i64,
    pub cash_amount_cents: i64,
    pub electron_amount_cents: i64,
    pub prepaid_amount_cents: i64,
    pub postpaid_amount_cents: i64,
    pub counter_offer_amount_cents: i64,
    pub server_num: String,
    pub cashier_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub should_print: bool,
    pub order_id: Option<String>,
    pub order_number: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub locked_previously: bool,
    pub cashier_role: Option<String>,
    pub cashier_inn: Option<String>,
    pub transaction_address: Option<String>,
    pub lines: Vec<Line>,
    pub result: Option<OperationResult>,
}

/// Lines compare as a multiset: storage does not preserve their order.
impl PartialEq for SaleRequest {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.account_id == other.account_id
            && self.fiscal_copy == other.fiscal_copy
            && self.web_cashbox_id == other.web_cashbox_id
            && self.operation_type == other.operation_type
            && self.status == other.status
            && self.kkt_receipt_id == other.kkt_receipt_id
            && self.amount_cents == other.amount_cents
            && self.cash_amount_cents == other.cash_amount_cents
            && self.electron_amount_cents == other.electron_amount_cents
            && self.prepaid_amount_cents == other.prepaid_amount_cents
            && self.postpaid_amount_cents == other.postpaid_amount_cents
            && self.counter_offer_amount_cents == other.counter_offer_amount_cents
            && self.server_num == other.server_num
            && self.cashier_name == other.cashier_name
            && self.email == other.email
            && self.phone_number == other.phone_number
            && self.should_print == other.should_print
            && self.order_id == other.order_id
            && self.order_number == other.order_number
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
            && self.archived_at == other.archived_at
            && self.locked_previously == other.locked_previously
            && self.cashier_role == other.cashier_role
            && self.cashier_inn == other.cashier_inn
            && self.transaction_address == other.transaction_address
            && self.result == other.result
            && same_lines(&self.lines, &other.lines)
    }
}

impl Eq for SaleRequest {}

fn same_lines(left: &[Line], right: &[Line]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    let mut left: Vec<&Line> = left.iter().collect();
    let mut right: Vec<&Line> = right.iter().collect();
    left.sort_by_key(|line| line.id);
    right.sort_by_key(|line| line.id);

    left == right
}

// =============================================================================
// Close Request
// =============================================================================

/// A request to close the current retail shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseRequest {
    pub id: i64,
    pub account_id: i64,
    pub web_cashbox_id: Option<i64>,
    pub status: Option<String>,
    pub should_print: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub locked_previously: bool,
    pub server_num: String,
    pub result: Option<OperationResult>,
}

// =============================================================================
// Correction Request
// =============================================================================

/// A tax correction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRequest {
    pub id: i64,
    pub operation_type: OperationType,
    pub amount_cents: i64,
    pub cash_amount_cents: i64,
    pub electron_amount_cents: i64,
    pub should_print: bool,
    pub cashier_name: Option<String>,
    pub vat_rate: TaxCode,
    pub correction_description: Option<String>,
    /// `self_correction` or `instruction_correction`.
    pub correction_type: String,
    pub document_number: Option<String>,
    pub document_date: Option<DateTime<Utc>>,
    pub status: String,
    pub order_id: String,
    pub order_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
    pub locked_previously: bool,
    pub server_num: String,
    pub result: Option<OperationResult>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, receipt_id: i64) -> Line {
        Line {
            id,
            receipt_id,
            title: format!("Line {id}"),
            quantity_milli: 1000,
            total_price_cents: 9900,
            price_cents: Some(9900),
            vat_rate: TaxCode::Twenty,
            vat_amount_cents: Some(1650),
            created_at: None,
            updated_at: None,
            payment_case: 4,
        }
    }

    fn sale(lines: Vec<Line>) -> SaleRequest {
        SaleRequest {
            id: 1,
            account_id: 7,
            fiscal_copy: false,
            web_cashbox_id: None,
            operation_type: OperationType::Sale,
            status: status::PENDING.to_string(),
            kkt_receipt_id: None,
            amount_cents: 9900,
            cash_amount_cents: 9900,
            electron_amount_cents: 0,
            prepaid_amount_cents: 0,
            postpaid_amount_cents: 0,
            counter_offer_amount_cents: 0,
            server_num: "srv-1".to_string(),
            cashier_name: None,
            email: None,
            phone_number: None,
            should_print: true,
            order_id: None,
            order_number: None,
            created_at: None,
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
    fn test_sale_equality_ignores_line_order() {
        let a = sale(vec![line(1, 1), line(2, 1), line(3, 1)]);
        let b = sale(vec![line(3, 1), line(1, 1), line(2, 1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sale_equality_detects_line_changes() {
        let a = sale(vec![line(1, 1), line(2, 1)]);
        let b = sale(vec![line(1, 1)]);
        assert_ne!(a, b);

        let mut changed = line(2, 1);
        changed.title = "Other".to_string();
        let c = sale(vec![line(1, 1), changed]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_tax_code_lookup() {
        assert_eq!(TaxCode::from_backend_value(Some(18)), Some(TaxCode::Eighteen));
        assert_eq!(TaxCode::from_backend_value(None), Some(TaxCode::NoVat));
        assert_eq!(TaxCode::from_backend_value(Some(7)), None);
        assert_eq!(TaxCode::Eighteen.tax_type_id(), TaxCode::Twenty.tax_type_id());
    }

    #[test]
    fn test_operation_type_lookups() {
        assert_eq!(
            OperationType::find_by_box_url("3"),
            Some(OperationType::ShiftClose)
        );
        assert_eq!(
            OperationType::find_by_type_name("SaleCor"),
            Some(OperationType::CorrectionSale)
        );
        assert_eq!(
            OperationType::find_by_backend_request_name("op_5"),
            Some(OperationType::CorrectionRefund)
        );
        assert_eq!(OperationType::find_by_box_url("42"), None);
    }

    #[test]
    fn test_storage_names_match_serde() {
        for code in TaxCode::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
            assert_eq!(code.as_str().parse::<TaxCode>().unwrap(), code);
        }
        for op in OperationType::ALL {
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json, format!("\"{}\"", op.as_str()));
            assert_eq!(op.as_str().parse::<OperationType>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_storage_names() {
        assert!(matches!(
            "nine".parse::<TaxCode>(),
            Err(CoreError::UnknownTaxCode(_))
        ));
        assert!(matches!(
            "refund".parse::<OperationType>(),
            Err(CoreError::UnknownOperationType(_))
        ));
    }
}
