//! # Seed Data Generator
//!
//! Fills a database with demo operation requests for development.
//!
//! ## Usage
//! ```bash
//! # 500 sales plus closes and corrections (default)
//! cargo run -p kassa-db --bin seed
//!
//! # Custom amount
//! cargo run -p kassa-db --bin seed -- --count 2000
//!
//! # Database path (otherwise KASSA_DB_PATH, then ./kassa.db)
//! cargo run -p kassa-db --bin seed -- --db ./data/kassa.db
//! ```
//!
//! ## Generated Requests
//! - `count` sales with 0-5 lines each; every 3rd is printed (has a result),
//!   every 10th is a pending fiscal copy
//! - `count / 5` shift closes and `count / 5` corrections, every 3rd with a
//!   result
//! - a sync error for every 7th request of each kind that has no result

use std::env;

use chrono::{Duration, Utc};
use kassa_core::{
    status, CloseRequest, CorrectionRequest, Line, OperationRequestError, OperationResult,
    OperationType, SaleRequest, TaxCode,
};
use kassa_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Receipt line titles for realistic test data
const TITLES: &[&str] = &[
    "Milk 3.2% 1L",
    "Rye Bread",
    "Buckwheat 900g",
    "Eggs C1 10pcs",
    "Sunflower Oil 1L",
    "Black Tea 100g",
    "Sugar 1kg",
    "Butter 82% 180g",
    "Kefir 1% 900ml",
    "Apples per kg",
];

/// Id ranges per kind; request ids are assigned by the backend in practice.
const SALE_BASE: i64 = 100_000;
const CLOSE_BASE: i64 = 200_000;
const CORRECTION_BASE: i64 = 300_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: i64 = 500;
    let mut config = DbConfig::from_env()?;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kassa Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of sale requests to generate (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: $KASSA_DB_PATH or ./kassa.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(
        path = %config.database_path.display(),
        count,
        "Seeding request store"
    );

    let db = Database::new(config).await?;

    if db.sales().first().await?.is_some() {
        println!("⚠ Database already has sale requests");
        println!("  Skipping seed to avoid duplicate ids.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let sales: Vec<SaleRequest> = (0..count).map(|n| generate_sale(SALE_BASE + n)).collect();
    let closes: Vec<CloseRequest> = (0..count / 5)
        .map(|n| generate_close(CLOSE_BASE + n))
        .collect();
    let corrections: Vec<CorrectionRequest> = (0..count / 5)
        .map(|n| generate_correction(CORRECTION_BASE + n))
        .collect();

    db.sales().add_all(&sales).await?;
    db.closes().add_all(&closes).await?;
    db.corrections().add_all(&corrections).await?;

    let errors: Vec<OperationRequestError> = sales
        .iter()
        .filter(|s| s.result.is_none())
        .map(|s| s.id)
        .chain(closes.iter().filter(|c| c.result.is_none()).map(|c| c.id))
        .chain(
            corrections
                .iter()
                .filter(|c| c.result.is_none())
                .map(|c| c.id),
        )
        .filter(|id| id % 7 == 0)
        .map(generate_error)
        .collect();
    db.errors().add_all(&errors).await?;

    info!(
        sales = sales.len(),
        closes = closes.len(),
        corrections = corrections.len(),
        errors = errors.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Requests written"
    );

    let sale_repo = db.sales();
    info!(
        kind = "sale",
        pending = sale_repo.not_completed().await?.len(),
        completed = sale_repo.completed().await?.len(),
        failed = sale_repo.failed().await?.len(),
        "Seeded"
    );
    let close_repo = db.closes();
    info!(
        kind = "close",
        pending = close_repo.not_completed().await?.len(),
        completed = close_repo.completed().await?.len(),
        failed = close_repo.failed().await?.len(),
        "Seeded"
    );
    let correction_repo = db.corrections();
    info!(
        kind = "correction",
        pending = correction_repo.not_completed().await?.len(),
        completed = correction_repo.completed().await?.len(),
        failed = correction_repo.failed().await?.len(),
        "Seeded"
    );

    db.close().await;
    println!("✓ Seed complete!");

    Ok(())
}

/// Installs the log subscriber.
///
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kassa=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Generates one sale request with realistic data.
fn generate_sale(id: i64) -> SaleRequest {
    let created = Utc::now() - Duration::minutes(id % 600);
    let printed = id % 3 == 0;
    let fiscal_copy = id % 10 == 0;

    let lines: Vec<Line> = (0..id % 6)
        .map(|n| {
            let quantity_milli = 1000 * (1 + n % 3);
            let price_cents = 4900 + (id * 37 + n * 113) % 20_000;
            let total_price_cents = price_cents * quantity_milli / 1000;
            let vat_rate = TaxCode::ALL[((id + n) % TaxCode::ALL.len() as i64) as usize];
            Line {
                id: id * 10 + n,
                receipt_id: id,
                title: TITLES[((id + n) % TITLES.len() as i64) as usize].to_string(),
                quantity_milli,
                total_price_cents,
                price_cents: Some(price_cents),
                vat_rate,
                vat_amount_cents: vat_rate
                    .backend_value()
                    .map(|pct| total_price_cents * i64::from(pct) / (100 + i64::from(pct))),
                created_at: Some(created),
                updated_at: None,
                payment_case: 4,
            }
        })
        .collect();

    let amount_cents: i64 = lines.iter().map(|l| l.total_price_cents).sum();
    let cash = id % 2 == 0;

    SaleRequest {
        id,
        account_id: 1 + id % 4,
        fiscal_copy,
        web_cashbox_id: Some(1 + id % 3),
        operation_type: if id % 13 == 0 {
            OperationType::Return
        } else {
            OperationType::Sale
        },
        status: if printed && !fiscal_copy {
            status::PRINTED.to_string()
        } else {
            status::PENDING.to_string()
        },
        kkt_receipt_id: printed.then_some(id),
        amount_cents,
        cash_amount_cents: if cash { amount_cents } else { 0 },
        electron_amount_cents: if cash { 0 } else { amount_cents },
        prepaid_amount_cents: 0,
        postpaid_amount_cents: 0,
        counter_offer_amount_cents: 0,
        server_num: Uuid::new_v4().to_string(),
        cashier_name: Some("Demo Cashier".to_string()),
        email: (id % 5 == 0).then(|| format!("customer{id}@example.com")),
        phone_number: None,
        should_print: true,
        order_id: Some(format!("ORD-{id}")),
        order_number: Some(id.to_string()),
        created_at: Some(created),
        updated_at: Some(created),
        archived_at: None,
        locked_previously: false,
        cashier_role: Some("cashier".to_string()),
        cashier_inn: None,
        transaction_address: None,
        lines,
        result: printed.then(|| OperationResult::new(id)),
    }
}

/// Generates one shift close request.
fn generate_close(id: i64) -> CloseRequest {
    let created = Utc::now() - Duration::hours(id % 48);
    CloseRequest {
        id,
        account_id: 1 + id % 4,
        web_cashbox_id: Some(1 + id % 3),
        status: Some(status::PENDING.to_string()),
        should_print: true,
        created_at: Some(created),
        updated_at: Some(created),
        archived_at: None,
        locked_previously: false,
        server_num: Uuid::new_v4().to_string(),
        result: (id % 3 == 0).then(|| OperationResult::new(id)),
    }
}

/// Generates one correction receipt.
fn generate_correction(id: i64) -> CorrectionRequest {
    let now = Utc::now();
    let amount_cents = 10_000 + (id * 53) % 90_000;
    CorrectionRequest {
        id,
        operation_type: if id % 2 == 0 {
            OperationType::CorrectionSale
        } else {
            OperationType::CorrectionRefund
        },
        amount_cents,
        cash_amount_cents: amount_cents,
        electron_amount_cents: 0,
        should_print: true,
        cashier_name: Some("Demo Cashier".to_string()),
        vat_rate: TaxCode::Twenty,
        correction_description: Some("Unregistered cash receipt".to_string()),
        correction_type: "self_correction".to_string(),
        document_number: Some(format!("{}", id % 1000)),
        document_date: Some(now - Duration::days(1)),
        status: status::PENDING.to_string(),
        order_id: format!("COR-{id}"),
        order_number: id.to_string(),
        created_at: now,
        updated_at: now,
        archived_at: now,
        locked_previously: false,
        server_num: Uuid::new_v4().to_string(),
        result: (id % 3 == 0).then(|| OperationResult::new(id)),
    }
}

/// Generates a sync failure for request `id`.
fn generate_error(id: i64) -> OperationRequestError {
    OperationRequestError {
        receipt_request_id: id,
        error_code: if id % 2 == 0 { 503 } else { 422 },
        error_description: if id % 2 == 0 {
            "Fiscal backend unavailable".to_string()
        } else {
            "Receipt rejected by backend".to_string()
        },
        recoverable: id % 2 == 0,
    }
}
