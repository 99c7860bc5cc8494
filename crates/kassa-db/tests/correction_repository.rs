mod common;

use common::{correction, failure, ids, open_db, sale};
use kassa_core::{CorrectionRequest, OperationResult, OperationType, TaxCode};
use kassa_db::DbError;

fn correction_ids(corrections: &[CorrectionRequest]) -> Vec<i64> {
    ids(corrections, |c| c.id)
}

fn acknowledged(id: i64) -> CorrectionRequest {
    CorrectionRequest {
        result: Some(OperationResult::new(id)),
        ..correction(id)
    }
}

#[tokio::test]
async fn add_then_get_all_roundtrips_enums_and_dates() {
    let db = open_db().await;
    let repo = db.corrections();

    let mut refund = correction(1);
    refund.operation_type = OperationType::CorrectionRefund;
    refund.vat_rate = TaxCode::NoVat;
    refund.document_date = None;
    repo.add(&refund).await.unwrap();

    assert_eq!(repo.get_all().await.unwrap(), vec![refund]);
}

#[tokio::test]
async fn add_all_is_one_transaction() {
    let db = open_db().await;
    let repo = db.corrections();

    let batch: Vec<_> = (1..=8)
        .map(|id| if id % 3 == 0 { acknowledged(id) } else { correction(id) })
        .collect();

    repo.add_all(&batch).await.unwrap();
    assert_eq!(db.transactions_started(), 1);

    let mut stored = repo.get_all().await.unwrap();
    stored.sort_by_key(|c| c.id);
    assert_eq!(stored, batch);
}

#[tokio::test]
async fn duplicate_id_rejected() {
    let db = open_db().await;
    let repo = db.corrections();

    repo.add(&correction(1)).await.unwrap();
    assert!(matches!(
        repo.add(&correction(1)).await,
        Err(DbError::UniqueViolation { .. })
    ));
}

#[tokio::test]
async fn blank_text_fields_are_stored_as_given() {
    let db = open_db().await;
    let repo = db.corrections();

    let mut request = correction(1);
    request.correction_type = " ".to_string();
    request.server_num = String::new();
    repo.add(&request).await.unwrap();

    assert_eq!(repo.get_all().await.unwrap(), vec![request]);
}

#[tokio::test]
async fn update_and_remove() {
    let db = open_db().await;
    let repo = db.corrections();

    repo.add(&correction(1)).await.unwrap();

    let done = acknowledged(1);
    assert!(repo.update(&done).await.unwrap());
    assert_eq!(repo.completed().await.unwrap(), vec![done]);

    assert!(!repo.update(&correction(9)).await.unwrap());

    assert!(repo.remove(1).await.unwrap());
    assert!(!repo.remove(1).await.unwrap());
    assert!(repo.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn kinds_do_not_leak_into_each_other() {
    let db = open_db().await;

    db.corrections()
        .add_all(&[correction(1), correction(2), acknowledged(3)])
        .await
        .unwrap();
    db.sales().add(&sale(2, 1)).await.unwrap();

    // The error table is shared: an error for id 2 hides both the sale
    // and the correction with that id
    db.errors().add(&failure(2)).await.unwrap();

    let repo = db.corrections();
    assert_eq!(correction_ids(&repo.not_completed().await.unwrap()), vec![1]);
    assert_eq!(correction_ids(&repo.failed().await.unwrap()), vec![2]);
    assert_eq!(correction_ids(&repo.completed().await.unwrap()), vec![3]);
    assert!(db.sales().not_completed().await.unwrap().is_empty());

    // Removing the sale leaves the correction's error alone
    assert!(db.sales().remove(2).await.unwrap());
    assert_eq!(correction_ids(&repo.failed().await.unwrap()), vec![2]);
    assert_eq!(correction_ids(&repo.not_completed().await.unwrap()), vec![1]);

    // Only the error store clears it
    assert!(db.errors().remove(2).await.unwrap());
    assert_eq!(correction_ids(&repo.not_completed().await.unwrap()), vec![1, 2]);
}
