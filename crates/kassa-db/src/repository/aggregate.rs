//! # Aggregate Repository
//!
//! One generic repository serving sale, shift close and correction requests.
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add(A)          validate ─► BEGIN ─► root ─► lines ─► result ─► COMMIT │
//! │                                                                         │
//! │  add_all([])     return Ok(())            (no transaction, no query)   │
//! │  add_all([A..])  validate all ─► BEGIN ─► roots ─► lines ─► results    │
//! │                                 (multi-row INSERT per table) ─► COMMIT │
//! │                                                                         │
//! │  update(A)       validate ─► BEGIN ─► UPDATE root                      │
//! │                     ├── 0 rows ─► ROLLBACK, false                      │
//! │                     └── 1 row  ─► DELETE lines, result                 │
//! │                                  ─► INSERT new lines, result ─► COMMIT │
//! │                                                                         │
//! │  remove(id)      BEGIN ─► DELETE root ─► COMMIT                        │
//! │                  (lines and result go with it; error rows stay)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failure drops the open transaction, which rolls it back: a root is
//! never stored without its lines and result.
//!
//! ## Reads
//! Every read is the join select of the kind, optionally restricted by a
//! [`Specification`], folded by the row reducer.

use std::marker::PhantomData;

use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::aggregate::Aggregate;
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::reducer::reduce;
use crate::repository::insert_batch;
use crate::registry::JoinSchema;
use crate::specification::{Selection, Specification};
use crate::sql;

/// Repository for one aggregate kind.
#[derive(Debug, Clone)]
pub struct AggregateRepository<A: Aggregate> {
    db: Database,
    kind: PhantomData<fn() -> A>,
}

impl<A: Aggregate> AggregateRepository<A> {
    /// Creates a new repository over `db`.
    pub fn new(db: Database) -> Self {
        AggregateRepository {
            db,
            kind: PhantomData,
        }
    }

    fn schema(&self) -> &JoinSchema {
        self.db.registry().schema(A::KIND)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts one aggregate with its lines and result.
    ///
    /// ## Errors
    /// - `DbError::Validation` - children don't belong to the root (nothing ran)
    /// - `DbError::UniqueViolation` - the id is already stored
    pub async fn add(&self, request: &A) -> DbResult<()> {
        request.validate()?;
        debug!(
            kind = %A::KIND,
            id = request.id(),
            lines = request.lines().len(),
            has_result = request.result().is_some(),
            "Adding request"
        );

        let mut tx = self.db.begin().await?;
        let statements = self.schema().statements();

        self.schema()
            .root()
            .bind_record(sqlx::query(&statements.insert_root), request)?
            .execute(&mut *tx)
            .await?;
        self.insert_children(&mut tx, request).await?;

        tx.commit().await.map_err(DbError::transaction)?;
        Ok(())
    }

    /// Inserts a batch of aggregates in one transaction.
    ///
    /// An empty batch returns immediately without touching storage.
    pub async fn add_all(&self, requests: &[A]) -> DbResult<()> {
        if requests.is_empty() {
            debug!(kind = %A::KIND, "Empty batch, nothing to add");
            return Ok(());
        }
        for request in requests {
            request.validate()?;
        }
        debug!(kind = %A::KIND, count = requests.len(), "Adding request batch");

        let schema = self.schema();
        let statements = schema.statements();
        let mut tx = self.db.begin().await?;

        let roots = insert_batch(
            &mut tx,
            schema.root(),
            &statements.insert_root_prefix,
            requests.iter(),
        )
        .await?;

        let mut lines = 0;
        if let (Some(joined), Some(prefix)) =
            (schema.lines(), statements.insert_line_prefix.as_deref())
        {
            lines = insert_batch(
                &mut tx,
                joined.mapping(),
                prefix,
                requests.iter().flat_map(|r| r.lines()),
            )
            .await?;
        }

        let results = insert_batch(
            &mut tx,
            schema.result().mapping(),
            &statements.insert_result_prefix,
            requests.iter().filter_map(|r| r.result()),
        )
        .await?;

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(kind = %A::KIND, roots, lines, results, "Request batch added");
        Ok(())
    }

    /// Overwrites the header and replaces lines and result wholesale.
    ///
    /// ## Returns
    /// * `Ok(true)` - header updated, children replaced
    /// * `Ok(false)` - no row with this id; nothing changed
    pub async fn update(&self, request: &A) -> DbResult<bool> {
        request.validate()?;
        debug!(kind = %A::KIND, id = request.id(), "Updating request");

        let statements = self.schema().statements();
        let mut tx = self.db.begin().await?;

        let rows = self
            .schema()
            .root()
            .bind_record(sqlx::query(&statements.update_root), request)?
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows != 1 {
            warn!(kind = %A::KIND, id = request.id(), rows, "Update matched no request");
            tx.rollback().await.map_err(DbError::transaction)?;
            return Ok(false);
        }

        if let Some(sql) = statements.delete_lines.as_deref() {
            sqlx::query(sql)
                .bind(request.id())
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(&statements.delete_result)
            .bind(request.id())
            .execute(&mut *tx)
            .await?;

        self.insert_children(&mut tx, request).await?;

        tx.commit().await.map_err(DbError::transaction)?;
        Ok(true)
    }

    /// Deletes the root row with `id`.
    ///
    /// Lines and result rows cascade through foreign keys. An error row
    /// recorded for `id` stays until the error store removes it.
    ///
    /// ## Returns
    /// `true` when exactly one row was removed.
    pub async fn remove(&self, id: i64) -> DbResult<bool> {
        debug!(kind = %A::KIND, id, "Removing request");

        let mut tx = self.db.begin().await?;
        let rows = sqlx::query(&self.schema().statements().delete_root)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await.map_err(DbError::transaction)?;

        if rows != 1 {
            warn!(kind = %A::KIND, id, rows, "Remove matched no request");
        }
        Ok(rows == 1)
    }

    async fn insert_children(&self, conn: &mut SqliteConnection, request: &A) -> DbResult<()> {
        let schema = self.schema();
        let statements = schema.statements();

        if let (Some(joined), Some(prefix)) =
            (schema.lines(), statements.insert_line_prefix.as_deref())
        {
            insert_batch(&mut *conn, joined.mapping(), prefix, request.lines()).await?;
        }

        if let Some(result) = request.result() {
            schema
                .result()
                .mapping()
                .bind_record(sqlx::query(&statements.insert_result), result)?
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every stored aggregate, in no particular order.
    pub async fn get_all(&self) -> DbResult<Vec<A>> {
        let mut tx = self.db.begin().await?;
        let rows = sqlx::query(&self.schema().statements().select)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await.map_err(DbError::transaction)?;

        let requests = reduce(self.schema(), &rows)?;
        debug!(kind = %A::KIND, rows = rows.len(), count = requests.len(), "Loaded requests");
        Ok(requests)
    }

    /// Runs a filtered read.
    ///
    /// Predicate, parameters and result shape all come from `spec`.
    pub async fn get(&self, spec: Specification) -> DbResult<Selection<A>> {
        let schema = self.schema();
        let sql = sql::join_select_where(schema, &spec.predicate(A::KIND, schema));

        let mut tx = self.db.begin().await?;
        let rows = spec.bind(sqlx::query(&sql)).fetch_all(&mut *tx).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        let requests = reduce(schema, &rows)?;
        debug!(
            kind = %A::KIND,
            spec = spec.name(),
            rows = rows.len(),
            count = requests.len(),
            "Queried requests"
        );
        Ok(spec.transform(requests))
    }

    /// The request with `id`, if stored.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<A>> {
        Ok(self.get(Specification::ById(id)).await?.into_single())
    }

    /// Any one stored request.
    pub async fn first(&self) -> DbResult<Option<A>> {
        Ok(self.get(Specification::First).await?.into_single())
    }

    /// Requests the backend acknowledged.
    pub async fn completed(&self) -> DbResult<Vec<A>> {
        Ok(self.get(Specification::HasResult).await?.into_vec())
    }

    /// Requests with a recorded sync error.
    pub async fn failed(&self) -> DbResult<Vec<A>> {
        Ok(self.get(Specification::HasError).await?.into_vec())
    }

    /// Requests still to be sent.
    pub async fn not_completed(&self) -> DbResult<Vec<A>> {
        Ok(self.get(Specification::NotCompleted).await?.into_vec())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use chrono::Utc;
    use kassa_core::{CloseRequest, OperationResult};

    fn close(id: i64) -> CloseRequest {
        CloseRequest {
            id,
            account_id: 77,
            web_cashbox_id: Some(3),
            status: Some("pending".to_string()),
            should_print: true,
            created_at: Some(Utc::now()),
            updated_at: None,
            archived_at: None,
            locked_previously: false,
            server_num: format!("close-{id}"),
            result: None,
        }
    }

    #[tokio::test]
    async fn test_batch_larger_than_one_statement() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo: AggregateRepository<CloseRequest> = AggregateRepository::new(db.clone());

        // 10 fields per close row: 3276 rows per statement
        let batch: Vec<_> = (1..=5000)
            .map(|id| {
                let mut request = close(id);
                if id % 2 == 0 {
                    request.result = Some(OperationResult::new(id));
                }
                request
            })
            .collect();

        repo.add_all(&batch).await.unwrap();

        assert_eq!(db.transactions_started(), 1);
        assert_eq!(repo.get_all().await.unwrap().len(), 5000);
        assert_eq!(repo.completed().await.unwrap().len(), 2500);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_nothing_behind() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo: AggregateRepository<CloseRequest> = AggregateRepository::new(db);

        // Duplicate id inside the batch
        let batch = vec![close(1), close(2), close(1)];
        assert!(matches!(
            repo.add_all(&batch).await,
            Err(DbError::UniqueViolation { .. })
        ));
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_opens_no_transaction() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo: AggregateRepository<CloseRequest> = AggregateRepository::new(db.clone());

        let mut request = close(1);
        request.result = Some(OperationResult::new(2));

        assert!(matches!(
            repo.add(&request).await,
            Err(DbError::Validation(_))
        ));
        assert!(matches!(
            repo.update(&request).await,
            Err(DbError::Validation(_))
        ));
        assert_eq!(db.transactions_started(), 0);
    }
}
