//! # Repository Module
//!
//! Repositories over the request store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Sync process                                                          │
//! │       │                                                                 │
//! │       │  db.sales().not_completed()                                    │
//! │       ▼                                                                 │
//! │  AggregateRepository<A>          ErrorRepository                       │
//! │  ├── add / add_all               ├── add / add_all                     │
//! │  ├── update / remove             ├── remove                            │
//! │  ├── get_all                     ├── get_all                           │
//! │  └── get(Specification)          └── get(receipt_id)                   │
//! │       │                                 │                               │
//! │       │  statements from the Registry   │                               │
//! │       ▼                                 ▼                               │
//! │  SQLite Database (one transaction per call)                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SaleRepository`] - Sale requests with lines and result
//! - [`CloseRepository`] - Shift close requests with result
//! - [`CorrectionRepository`] - Correction receipts with result
//! - [`ErrorRepository`] - Sync failures of any request kind

pub mod aggregate;
pub mod operation_error;

use kassa_core::{CloseRequest, CorrectionRequest, SaleRequest};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::error::DbResult;
use crate::mapping::{Record, TableMapping};

pub use aggregate::AggregateRepository;
pub use operation_error::ErrorRepository;

pub type SaleRepository = AggregateRepository<SaleRequest>;
pub type CloseRepository = AggregateRepository<CloseRequest>;
pub type CorrectionRepository = AggregateRepository<CorrectionRequest>;

/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER` since 3.32.
const BIND_LIMIT: usize = 32_766;

/// Multi-row INSERT of `records`, split to stay under the bind limit.
///
/// Returns the number of rows inserted.
pub(crate) async fn insert_batch<'a, R, I>(
    conn: &mut SqliteConnection,
    mapping: &TableMapping,
    prefix: &str,
    records: I,
) -> DbResult<u64>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let records: Vec<&R> = records.into_iter().collect();
    let per_statement = (BIND_LIMIT / mapping.fields().len()).max(1);

    let mut inserted = 0;
    for chunk in records.chunks(per_statement) {
        let mut rows = Vec::with_capacity(chunk.len());
        for record in chunk {
            let values = record.values();
            mapping.check_values(&values)?;
            rows.push(values);
        }

        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(prefix);
        builder.push_values(rows, |mut tuple, values| {
            for value in values {
                value.push_to(&mut tuple);
            }
        });
        inserted += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}

