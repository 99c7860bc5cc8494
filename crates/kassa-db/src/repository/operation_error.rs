//! # Error Repository
//!
//! Flat store of sync failures, one row per request id whatever the
//! request kind. A stored error takes the request out of the
//! "not completed" set until the error is removed.

use kassa_core::OperationRequestError;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::mapping::{AliasedRow, Record, TableMapping};
use crate::pool::Database;
use crate::repository::insert_batch;
use crate::sql;

/// Repository for `operation_errors`.
#[derive(Debug, Clone)]
pub struct ErrorRepository {
    db: Database,
}

impl ErrorRepository {
    /// Creates a new ErrorRepository.
    pub fn new(db: Database) -> Self {
        ErrorRepository { db }
    }

    fn mapping(&self) -> &TableMapping {
        self.db.registry().errors()
    }

    /// Records a sync failure.
    ///
    /// ## Errors
    /// - `DbError::UniqueViolation` - the request already has an error
    pub async fn add(&self, error: &OperationRequestError) -> DbResult<()> {
        debug!(
            receipt_id = error.receipt_request_id,
            code = error.error_code,
            recoverable = error.recoverable,
            "Recording operation error"
        );

        let sql = sql::insert(self.mapping());
        let mut tx = self.db.begin().await?;
        self.mapping()
            .bind_record(sqlx::query(&sql), error)?
            .execute(&mut *tx)
            .await?;
        tx.commit().await.map_err(DbError::transaction)?;
        Ok(())
    }

    /// Records several failures in one transaction. Empty input is a no-op.
    pub async fn add_all(&self, errors: &[OperationRequestError]) -> DbResult<()> {
        if errors.is_empty() {
            return Ok(());
        }
        debug!(count = errors.len(), "Recording operation errors");

        let prefix = sql::insert_prefix(self.mapping());
        let mut tx = self.db.begin().await?;
        insert_batch(&mut tx, self.mapping(), &prefix, errors.iter()).await?;
        tx.commit().await.map_err(DbError::transaction)?;
        Ok(())
    }

    /// Clears the error of request `receipt_id`.
    ///
    /// ## Returns
    /// `true` when an error row was removed.
    pub async fn remove(&self, receipt_id: i64) -> DbResult<bool> {
        let sql = sql::delete_by_key(self.mapping().table(), self.mapping().key_column());

        let mut tx = self.db.begin().await?;
        let rows = sqlx::query(&sql)
            .bind(receipt_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await.map_err(DbError::transaction)?;

        if rows != 1 {
            warn!(receipt_id, "No operation error to remove");
        }
        Ok(rows == 1)
    }

    /// Every recorded error.
    pub async fn get_all(&self) -> DbResult<Vec<OperationRequestError>> {
        let sql = sql::select(self.mapping());
        self.fetch(&sql, None).await
    }

    /// The error recorded for request `receipt_id`, if any.
    pub async fn get(&self, receipt_id: i64) -> DbResult<Option<OperationRequestError>> {
        let sql = format!(
            "{} WHERE {}.{} = ?1",
            sql::select(self.mapping()),
            self.mapping().alias(),
            self.mapping().key_column()
        );
        Ok(self.fetch(&sql, Some(receipt_id)).await?.into_iter().next())
    }

    async fn fetch(
        &self,
        sql: &str,
        receipt_id: Option<i64>,
    ) -> DbResult<Vec<OperationRequestError>> {
        let mut query = sqlx::query(sql);
        if let Some(id) = receipt_id {
            query = query.bind(id);
        }

        let mut tx = self.db.begin().await?;
        let rows = query.fetch_all(&mut *tx).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        let alias = self.mapping().alias();
        let errors = rows
            .iter()
            .map(|row| OperationRequestError::decode(&AliasedRow::new(row, alias)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(errors)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;

    fn failure(receipt_id: i64) -> OperationRequestError {
        OperationRequestError {
            receipt_request_id: receipt_id,
            error_code: 422,
            error_description: format!("request {receipt_id} rejected"),
            recoverable: receipt_id % 2 == 0,
        }
    }

    #[tokio::test]
    async fn test_add_get_remove() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.errors();

        repo.add(&failure(4)).await.unwrap();

        assert_eq!(repo.get(4).await.unwrap(), Some(failure(4)));
        assert_eq!(repo.get(5).await.unwrap(), None);

        assert!(repo.remove(4).await.unwrap());
        assert!(!repo.remove(4).await.unwrap());
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_error_for_same_request_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.errors();

        repo.add(&failure(1)).await.unwrap();
        assert!(matches!(
            repo.add(&failure(1)).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_all() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.errors();

        repo.add_all(&[]).await.unwrap();
        assert_eq!(db.transactions_started(), 0);

        let batch: Vec<_> = (1..=3).map(failure).collect();
        repo.add_all(&batch).await.unwrap();
        assert_eq!(db.transactions_started(), 1);

        let mut stored = repo.get_all().await.unwrap();
        stored.sort_by_key(|e| e.receipt_request_id);
        assert_eq!(stored, batch);
    }
}
