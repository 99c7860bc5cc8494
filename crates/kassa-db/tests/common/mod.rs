#![allow(dead_code)]

use chrono::{DateTime, SubsecRound, Utc};
use kassa_core::{
    status, CloseRequest, CorrectionRequest, Line, OperationRequestError, OperationResult,
    OperationType, SaleRequest, TaxCode,
};
use kassa_db::{Database, DbConfig};
use uuid::Uuid;

pub async fn open_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Millisecond precision, so stored timestamps compare equal.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn line(id: i64, receipt_id: i64) -> Line {
    Line {
        id,
        receipt_id,
        title: format!("item {id}"),
        quantity_milli: 1500,
        total_price_cents: 1350 + id,
        price_cents: Some(900),
        vat_rate: TaxCode::ALL[(id as usize) % TaxCode::ALL.len()],
        vat_amount_cents: (id % 2 == 0).then_some(225),
        created_at: Some(now()),
        updated_at: None,
        payment_case: 4,
    }
}

/// Sale `id` with `lines` lines numbered `id * 100 + n`.
pub fn sale(id: i64, lines: i64) -> SaleRequest {
    let created = now();
    SaleRequest {
        id,
        account_id: 12,
        fiscal_copy: false,
        web_cashbox_id: Some(3),
        operation_type: OperationType::Sale,
        status: status::PENDING.to_string(),
        kkt_receipt_id: None,
        amount_cents: 4500,
        cash_amount_cents: 4500,
        electron_amount_cents: 0,
        prepaid_amount_cents: 0,
        postpaid_amount_cents: 0,
        counter_offer_amount_cents: 0,
        server_num: Uuid::new_v4().to_string(),
        cashier_name: Some("Petrova".to_string()),
        email: Some(format!("buyer{id}@example.com")),
        phone_number: None,
        should_print: true,
        order_id: Some(format!("ORD-{id}")),
        order_number: Some(id.to_string()),
        created_at: Some(created),
        updated_at: Some(created),
        archived_at: None,
        locked_previously: false,
        cashier_role: Some("senior".to_string()),
        cashier_inn: Some("7707083893".to_string()),
        transaction_address: None,
        lines: (0..lines).map(|n| line(id * 100 + n, id)).collect(),
        result: None,
    }
}

/// Sale marked printed with a stored result.
pub fn printed_sale(id: i64, lines: i64) -> SaleRequest {
    SaleRequest {
        status: status::PRINTED.to_string(),
        kkt_receipt_id: Some(id + 9000),
        result: Some(OperationResult::new(id)),
        ..sale(id, lines)
    }
}

pub fn close(id: i64) -> CloseRequest {
    let created = now();
    CloseRequest {
        id,
        account_id: 12,
        web_cashbox_id: Some(3),
        status: Some(status::PENDING.to_string()),
        should_print: true,
        created_at: Some(created),
        updated_at: None,
        archived_at: None,
        locked_previously: false,
        server_num: Uuid::new_v4().to_string(),
        result: None,
    }
}

pub fn correction(id: i64) -> CorrectionRequest {
    let created = now();
    CorrectionRequest {
        id,
        operation_type: OperationType::CorrectionSale,
        amount_cents: 12_000,
        cash_amount_cents: 12_000,
        electron_amount_cents: 0,
        should_print: true,
        cashier_name: Some("Petrova".to_string()),
        vat_rate: TaxCode::Twenty,
        correction_description: Some("Receipt not issued".to_string()),
        correction_type: "self_correction".to_string(),
        document_number: Some(format!("DOC-{id}")),
        document_date: Some(created),
        status: status::PENDING.to_string(),
        order_id: format!("COR-{id}"),
        order_number: id.to_string(),
        created_at: created,
        updated_at: created,
        archived_at: created,
        locked_previously: false,
        server_num: Uuid::new_v4().to_string(),
        result: None,
    }
}

pub fn failure(receipt_id: i64) -> OperationRequestError {
    OperationRequestError {
        receipt_request_id: receipt_id,
        error_code: 503,
        error_description: "fiscal backend unavailable".to_string(),
        recoverable: true,
    }
}

/// Ids of `items`, sorted.
pub fn ids<T>(items: &[T], id: impl Fn(&T) -> i64) -> Vec<i64> {
    let mut ids: Vec<i64> = items.iter().map(id).collect();
    ids.sort_unstable();
    ids
}
