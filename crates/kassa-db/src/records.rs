//! # Record Mappings
//!
//! The constant field ↔ column tables for every stored type, and the
//! [`Aggregate`] wiring for the three request kinds.
//!
//! Field names follow the domain structs; column names follow the schema in
//! `migrations/sqlite` (so `fiscal_copy` lives in `fiscalcopy`, amounts drop
//! their `_cents` suffix, `operation_type` lives in `type`).

use kassa_core::validation::{
    validate_close, validate_correction, validate_sale, ValidationResult,
};
use kassa_core::{
    CloseRequest, CorrectionRequest, Line, OperationRequestError, OperationResult, SaleRequest,
};

use crate::aggregate::{Aggregate, NoLines, OperationKind};
use crate::mapping::{field, AliasedRow, FieldColumn, FieldValue, Record};

// =============================================================================
// Sale
// =============================================================================

const SALE_FIELDS: &[FieldColumn] = &[
    field("id", "id"),
    field("account_id", "account_id"),
    field("fiscal_copy", "fiscalcopy"),
    field("web_cashbox_id", "web_cashbox_id"),
    field("operation_type", "type"),
    field("status", "status"),
    field("kkt_receipt_id", "kkt_receipt_id"),
    field("amount", "amount"),
    field("cash_amount", "cash_amount"),
    field("electron_amount", "electron_amount"),
    field("prepaid_amount", "prepaid_amount"),
    field("postpaid_amount", "postpaid_amount"),
    field("counter_offer_amount", "counter_offer_amount"),
    field("server_num", "server_num"),
    field("cashier_name", "cashier_name"),
    field("email", "email"),
    field("phone_number", "phone_number"),
    field("should_print", "should_print"),
    field("order_id", "order_id"),
    field("order_number", "order_number"),
    field("created_at", "created_at"),
    field("updated_at", "updated_at"),
    field("archived_at", "archived_at"),
    field("locked_previously", "locked_previously"),
    field("cashier_role", "cashier_role"),
    field("cashier_inn", "cashier_inn"),
    field("transaction_address", "transaction_address"),
];

impl Record for SaleRequest {
    const FIELDS: &'static [FieldColumn] = SALE_FIELDS;

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.account_id.into(),
            self.fiscal_copy.into(),
            self.web_cashbox_id.into(),
            self.operation_type.into(),
            (&self.status).into(),
            self.kkt_receipt_id.into(),
            self.amount_cents.into(),
            self.cash_amount_cents.into(),
            self.electron_amount_cents.into(),
            self.prepaid_amount_cents.into(),
            self.postpaid_amount_cents.into(),
            self.counter_offer_amount_cents.into(),
            (&self.server_num).into(),
            (&self.cashier_name).into(),
            (&self.email).into(),
            (&self.phone_number).into(),
            self.should_print.into(),
            (&self.order_id).into(),
            (&self.order_number).into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.archived_at.into(),
            self.locked_previously.into(),
            (&self.cashier_role).into(),
            (&self.cashier_inn).into(),
            (&self.transaction_address).into(),
        ]
    }

    fn decode(row: &AliasedRow<'_>) -> Result<Self, sqlx::Error> {
        Ok(SaleRequest {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            fiscal_copy: row.get("fiscal_copy")?,
            web_cashbox_id: row.get("web_cashbox_id")?,
            operation_type: row.parse("operation_type")?,
            status: row.get("status")?,
            kkt_receipt_id: row.get("kkt_receipt_id")?,
            amount_cents: row.get("amount")?,
            cash_amount_cents: row.get("cash_amount")?,
            electron_amount_cents: row.get("electron_amount")?,
            prepaid_amount_cents: row.get("prepaid_amount")?,
            postpaid_amount_cents: row.get("postpaid_amount")?,
            counter_offer_amount_cents: row.get("counter_offer_amount")?,
            server_num: row.get("server_num")?,
            cashier_name: row.get("cashier_name")?,
            email: row.get("email")?,
            phone_number: row.get("phone_number")?,
            should_print: row.get("should_print")?,
            order_id: row.get("order_id")?,
            order_number: row.get("order_number")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            archived_at: row.get("archived_at")?,
            locked_previously: row.get("locked_previously")?,
            cashier_role: row.get("cashier_role")?,
            cashier_inn: row.get("cashier_inn")?,
            transaction_address: row.get("transaction_address")?,
            lines: Vec::new(),
            result: None,
        })
    }
}

impl Aggregate for SaleRequest {
    type Line = Line;

    const KIND: OperationKind = OperationKind::Sale;
    const TABLE: &'static str = "sale_requests";
    const RESULT_TABLE: &'static str = "sale_results";
    const LINE_TABLE: Option<&'static str> = Some("lines");

    fn id(&self) -> i64 {
        self.id
    }

    fn lines(&self) -> &[Line] {
        &self.lines
    }

    fn result(&self) -> Option<&OperationResult> {
        self.result.as_ref()
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_sale(self)
    }

    fn assemble(self, lines: Vec<Line>, result: Option<OperationResult>) -> Self {
        SaleRequest {
            lines,
            result,
            ..self
        }
    }
}

const LINE_FIELDS: &[FieldColumn] = &[
    field("id", "id"),
    field("receipt_id", "receipt_id"),
    field("title", "title"),
    field("quantity", "quantity"),
    field("total_price", "total_price"),
    field("price", "price"),
    field("vat_rate", "vat_rate"),
    field("vat_amount", "vat_amount"),
    field("created_at", "created_at"),
    field("updated_at", "updated_at"),
    field("payment_case", "payment_case"),
];

impl Record for Line {
    const FIELDS: &'static [FieldColumn] = LINE_FIELDS;

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.receipt_id.into(),
            (&self.title).into(),
            self.quantity_milli.into(),
            self.total_price_cents.into(),
            self.price_cents.into(),
            self.vat_rate.into(),
            self.vat_amount_cents.into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.payment_case.into(),
        ]
    }

    fn decode(row: &AliasedRow<'_>) -> Result<Self, sqlx::Error> {
        Ok(Line {
            id: row.get("id")?,
            receipt_id: row.get("receipt_id")?,
            title: row.get("title")?,
            quantity_milli: row.get("quantity")?,
            total_price_cents: row.get("total_price")?,
            price_cents: row.get("price")?,
            vat_rate: row.parse("vat_rate")?,
            vat_amount_cents: row.get("vat_amount")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            payment_case: row.get("payment_case")?,
        })
    }
}

// =============================================================================
// Close
// =============================================================================

const CLOSE_FIELDS: &[FieldColumn] = &[
    field("id", "id"),
    field("account_id", "account_id"),
    field("web_cashbox_id", "web_cashbox_id"),
    field("status", "status"),
    field("should_print", "should_print"),
    field("created_at", "created_at"),
    field("updated_at", "updated_at"),
    field("archived_at", "archived_at"),
    field("locked_previously", "locked_previously"),
    field("server_num", "server_num"),
];

impl Record for CloseRequest {
    const FIELDS: &'static [FieldColumn] = CLOSE_FIELDS;

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.account_id.into(),
            self.web_cashbox_id.into(),
            (&self.status).into(),
            self.should_print.into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.archived_at.into(),
            self.locked_previously.into(),
            (&self.server_num).into(),
        ]
    }

    fn decode(row: &AliasedRow<'_>) -> Result<Self, sqlx::Error> {
        Ok(CloseRequest {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            web_cashbox_id: row.get("web_cashbox_id")?,
            status: row.get("status")?,
            should_print: row.get("should_print")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            archived_at: row.get("archived_at")?,
            locked_previously: row.get("locked_previously")?,
            server_num: row.get("server_num")?,
            result: None,
        })
    }
}

impl Aggregate for CloseRequest {
    type Line = NoLines;

    const KIND: OperationKind = OperationKind::Close;
    const TABLE: &'static str = "close_retail_shift_requests";
    const RESULT_TABLE: &'static str = "close_results";
    const LINE_TABLE: Option<&'static str> = None;

    fn id(&self) -> i64 {
        self.id
    }

    fn lines(&self) -> &[NoLines] {
        &[]
    }

    fn result(&self) -> Option<&OperationResult> {
        self.result.as_ref()
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_close(self)
    }

    fn assemble(self, _lines: Vec<NoLines>, result: Option<OperationResult>) -> Self {
        CloseRequest { result, ..self }
    }
}

// =============================================================================
// Correction
// =============================================================================

const CORRECTION_FIELDS: &[FieldColumn] = &[
    field("id", "id"),
    field("operation_type", "type"),
    field("amount", "amount"),
    field("cash_amount", "cash_amount"),
    field("electron_amount", "electron_amount"),
    field("should_print", "should_print"),
    field("cashier_name", "cashier_name"),
    field("vat_rate", "vat_rate"),
    field("correction_description", "correction_description"),
    field("correction_type", "correction_type"),
    field("document_number", "document_number"),
    field("document_date", "document_date"),
    field("status", "status"),
    field("order_id", "order_id"),
    field("order_number", "order_number"),
    field("created_at", "created_at"),
    field("updated_at", "updated_at"),
    field("archived_at", "archived_at"),
    field("locked_previously", "locked_previously"),
    field("server_num", "server_num"),
];

impl Record for CorrectionRequest {
    const FIELDS: &'static [FieldColumn] = CORRECTION_FIELDS;

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.into(),
            self.operation_type.into(),
            self.amount_cents.into(),
            self.cash_amount_cents.into(),
            self.electron_amount_cents.into(),
            self.should_print.into(),
            (&self.cashier_name).into(),
            self.vat_rate.into(),
            (&self.correction_description).into(),
            (&self.correction_type).into(),
            (&self.document_number).into(),
            self.document_date.into(),
            (&self.status).into(),
            (&self.order_id).into(),
            (&self.order_number).into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.archived_at.into(),
            self.locked_previously.into(),
            (&self.server_num).into(),
        ]
    }

    fn decode(row: &AliasedRow<'_>) -> Result<Self, sqlx::Error> {
        Ok(CorrectionRequest {
            id: row.get("id")?,
            operation_type: row.parse("operation_type")?,
            amount_cents: row.get("amount")?,
            cash_amount_cents: row.get("cash_amount")?,
            electron_amount_cents: row.get("electron_amount")?,
            should_print: row.get("should_print")?,
            cashier_name: row.get("cashier_name")?,
            vat_rate: row.parse("vat_rate")?,
            correction_description: row.get("correction_description")?,
            correction_type: row.get("correction_type")?,
            document_number: row.get("document_number")?,
            document_date: row.get("document_date")?,
            status: row.get("status")?,
            order_id: row.get("order_id")?,
            order_number: row.get("order_number")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            archived_at: row.get("archived_at")?,
            locked_previously: row.get("locked_previously")?,
            server_num: row.get("server_num")?,
            result: None,
        })
    }
}

impl Aggregate for CorrectionRequest {
    type Line = NoLines;

    const KIND: OperationKind = OperationKind::Correction;
    const TABLE: &'static str = "correction_receipts";
    const RESULT_TABLE: &'static str = "correction_results";
    const LINE_TABLE: Option<&'static str> = None;

    fn id(&self) -> i64 {
        self.id
    }

    fn lines(&self) -> &[NoLines] {
        &[]
    }

    fn result(&self) -> Option<&OperationResult> {
        self.result.as_ref()
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_correction(self)
    }

    fn assemble(self, _lines: Vec<NoLines>, result: Option<OperationResult>) -> Self {
        CorrectionRequest { result, ..self }
    }
}

// =============================================================================
// Results and Errors
// =============================================================================

const RESULT_FIELDS: &[FieldColumn] = &[field("receipt_id", "receipt_id")];

impl Record for OperationResult {
    const FIELDS: &'static [FieldColumn] = RESULT_FIELDS;

    fn values(&self) -> Vec<FieldValue> {
        vec![self.receipt_id.into()]
    }

    fn decode(row: &AliasedRow<'_>) -> Result<Self, sqlx::Error> {
        Ok(OperationResult::new(row.get("receipt_id")?))
    }
}

/// Shared error table, keyed by the request id whatever its kind.
pub const ERROR_TABLE: &str = "operation_errors";

const ERROR_FIELDS: &[FieldColumn] = &[
    field("receipt_request_id", "receipt_id"),
    field("error_code", "error_code"),
    field("error_description", "error_description"),
    field("recoverable", "recoverable"),
];

impl Record for OperationRequestError {
    const FIELDS: &'static [FieldColumn] = ERROR_FIELDS;

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.receipt_request_id.into(),
            self.error_code.into(),
            (&self.error_description).into(),
            self.recoverable.into(),
        ]
    }

    fn decode(row: &AliasedRow<'_>) -> Result<Self, sqlx::Error> {
        Ok(OperationRequestError {
            receipt_request_id: row.get("receipt_request_id")?,
            error_code: row.get("error_code")?,
            error_description: row.get("error_description")?,
            recoverable: row.get("recoverable")?,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
