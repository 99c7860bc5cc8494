//! # Row Reducer
//!
//! Folds the flat rows of a join select back into aggregates.
//!
//! ## Example
//! ```text
//! r_id  re_receipt_id  l_id          Sale 7 { lines: [1, 3], result: Some }
//! ────  ─────────────  ────          Sale 9 { lines: [2],    result: None }
//!  7         7           1    ──►
//!  9       NULL          2
//!  7         7           3
//! ```
//!
//! Rows are grouped by root id, not by adjacency, so interleaved rows are
//! fine. Aggregates come out in the order their id was first seen. A child
//! or result is attached only when its key column (the sentinel) is
//! non-null; a root with no lines ends up with an empty `Vec`.

use std::collections::HashMap;

use kassa_core::OperationResult;
use sqlx::sqlite::SqliteRow;

use crate::aggregate::Aggregate;
use crate::error::DbResult;
use crate::mapping::{AliasedRow, Record};
use crate::registry::JoinSchema;

struct Partial<A: Aggregate> {
    header: A,
    lines: Vec<A::Line>,
    result: Option<OperationResult>,
}

/// Reconstructs aggregates from `rows` produced by the join select of
/// `schema`.
pub fn reduce<A: Aggregate>(schema: &JoinSchema, rows: &[SqliteRow]) -> DbResult<Vec<A>> {
    let root = schema.root();
    let result = schema.result().mapping();

    let mut partials: Vec<Partial<A>> = Vec::new();
    let mut seen: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let root_view = AliasedRow::new(row, root.alias());
        let id: i64 = root_view.get(root.key_field())?;

        let slot = match seen.get(&id) {
            Some(&slot) => slot,
            None => {
                partials.push(Partial {
                    header: A::decode(&root_view)?,
                    lines: Vec::new(),
                    result: None,
                });
                seen.insert(id, partials.len() - 1);
                partials.len() - 1
            }
        };
        let partial = &mut partials[slot];

        if let Some(lines) = schema.lines() {
            let mapping = lines.mapping();
            let view = AliasedRow::new(row, mapping.alias());
            if view.is_present(mapping.key_field())? {
                partial.lines.push(A::Line::decode(&view)?);
            }
        }

        // Repeated on every line row of the same root; first one wins
        if partial.result.is_none() {
            let view = AliasedRow::new(row, result.alias());
            if view.is_present(result.key_field())? {
                partial.result = Some(OperationResult::decode(&view)?);
            }
        }
    }

    Ok(partials
        .into_iter()
        .map(|p| p.header.assemble(p.lines, p.result))
        .collect())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::OperationKind;
    use crate::mapping::TableMapping;
    use crate::pool::{Database, DbConfig};
    use crate::sql;
    use chrono::Utc;
    use kassa_core::{status, CloseRequest, Line, OperationType, SaleRequest, TaxCode};

    fn sale(id: i64) -> SaleRequest {
        SaleRequest {
            id,
            account_id: 1,
            fiscal_copy: false,
            web_cashbox_id: None,
            operation_type: OperationType::Sale,
            status: status::PENDING.to_string(),
            kkt_receipt_id: None,
            amount_cents: 1000,
            cash_amount_cents: 1000,
            electron_amount_cents: 0,
            prepaid_amount_cents: 0,
            postpaid_amount_cents: 0,
            counter_offer_amount_cents: 0,
            server_num: format!("srv-{id}"),
            cashier_name: None,
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
            lines: Vec::new(),
            result: None,
        }
    }

    fn line(id: i64, receipt_id: i64) -> Line {
        Line {
            id,
            receipt_id,
            title: format!("item {id}"),
            quantity_milli: 1000,
            total_price_cents: 500,
            price_cents: Some(500),
            vat_rate: TaxCode::Twenty,
            vat_amount_cents: Some(83),
            created_at: None,
            updated_at: None,
            payment_case: 4,
        }
    }

    async fn insert<R: Record>(db: &Database, mapping: &TableMapping, record: &R) {
        let sql = sql::insert(mapping);
        mapping
            .bind_record(sqlx::query(&sql), record)
            .unwrap()
            .execute(db.pool())
            .await
            .unwrap();
    }

    async fn seed_sale(db: &Database, request: &SaleRequest) {
        let schema = db.registry().schema(OperationKind::Sale);
        insert(db, schema.root(), request).await;
        for l in &request.lines {
            insert(db, schema.lines().unwrap().mapping(), l).await;
        }
        if let Some(result) = &request.result {
            insert(db, schema.result().mapping(), result).await;
        }
    }

    async fn select(db: &Database, suffix: &str) -> Vec<SqliteRow> {
        let schema = db.registry().schema(OperationKind::Sale);
        let sql = format!("{} {}", schema.statements().select, suffix);
        sqlx::query(&sql).fetch_all(db.pool()).await.unwrap()
    }

    #[tokio::test]
    async fn test_interleaved_rows_group_by_identity() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut first = sale(7);
        first.lines = vec![line(1, 7), line(3, 7)];
        first.result = Some(OperationResult::new(7));
        let mut second = sale(9);
        second.lines = vec![line(2, 9), line(4, 9)];
        seed_sale(&db, &first).await;
        seed_sale(&db, &second).await;

        // Ordering by line id alternates 7, 9, 7, 9
        let rows = select(&db, "ORDER BY l.id").await;
        assert_eq!(rows.len(), 4);

        let schema = db.registry().schema(OperationKind::Sale);
        let reduced: Vec<SaleRequest> = reduce(schema, &rows).unwrap();

        assert_eq!(reduced.len(), 2);
        assert_eq!(reduced[0].id, 7);
        assert_eq!(reduced[1].id, 9);
        assert_eq!(reduced[0].lines.iter().map(|l| l.id).collect::<Vec<_>>(), [1, 3]);
        assert_eq!(reduced[1].lines.iter().map(|l| l.id).collect::<Vec<_>>(), [2, 4]);
        assert_eq!(reduced[0].result, Some(OperationResult::new(7)));
        assert_eq!(reduced[1].result, None);
        assert_eq!(reduced[0], first);
        assert_eq!(reduced[1], second);
    }

    #[tokio::test]
    async fn test_interleaved_roots_without_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut with_lines = sale(20);
        with_lines.lines = vec![line(1, 20), line(3, 20), line(5, 20)];
        let bare_a = sale(2);
        let mut bare_b = sale(4);
        bare_b.result = Some(OperationResult::new(4));
        for request in [&with_lines, &bare_a, &bare_b] {
            seed_sale(&db, request).await;
        }

        // Rows come out as 20, 2, 20, 4, 20
        let rows = select(&db, "ORDER BY COALESCE(l.id, r.id)").await;
        assert_eq!(rows.len(), 5);

        let schema = db.registry().schema(OperationKind::Sale);
        let reduced: Vec<SaleRequest> = reduce(schema, &rows).unwrap();

        assert_eq!(
            reduced.iter().map(|s| s.id).collect::<Vec<_>>(),
            [20, 2, 4]
        );
        assert_eq!(reduced[0], with_lines);
        assert_eq!(reduced[1], bare_a);
        assert_eq!(reduced[2], bare_b);
        assert!(reduced[1].lines.is_empty());
        assert!(reduced[2].lines.is_empty());
    }

    #[tokio::test]
    async fn test_root_without_lines_has_empty_vec() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut bare = sale(5);
        bare.result = Some(OperationResult::new(5));
        seed_sale(&db, &bare).await;

        let rows = select(&db, "").await;
        let schema = db.registry().schema(OperationKind::Sale);
        let reduced: Vec<SaleRequest> = reduce(schema, &rows).unwrap();

        assert_eq!(reduced.len(), 1);
        assert!(reduced[0].lines.is_empty());
        assert_eq!(reduced[0].result, Some(OperationResult::new(5)));
    }

    #[tokio::test]
    async fn test_lines_without_result() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut request = sale(11);
        request.lines = (100..110).map(|id| line(id, 11)).collect();
        seed_sale(&db, &request).await;

        let rows = select(&db, "").await;
        let schema = db.registry().schema(OperationKind::Sale);
        let reduced: Vec<SaleRequest> = reduce(schema, &rows).unwrap();

        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].lines.len(), 10);
        assert!(reduced[0].result.is_none());
        assert_eq!(reduced[0], request);
    }

    #[tokio::test]
    async fn test_no_rows_no_aggregates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let schema = db.registry().schema(OperationKind::Close);

        let reduced: Vec<CloseRequest> = reduce(schema, &[]).unwrap();
        assert!(reduced.is_empty());
    }
}
