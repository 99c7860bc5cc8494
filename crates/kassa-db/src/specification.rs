//! # Specifications
//!
//! The closed set of filtered reads the sync process runs against the
//! request tables.
//!
//! ## Predicates
//! ```text
//! ┌──────────────┬─────────────────────────────────┬──────────────────────────────────┐
//! │ variant      │ close / correction              │ sale                             │
//! ├──────────────┼─────────────────────────────────┼──────────────────────────────────┤
//! │ ById(id)     │ r.id = ?1                       │ same                             │
//! │ First        │ r.id IN (one root id)           │ same                             │
//! │ HasResult    │ re.receipt_id IS NOT NULL       │ r.status = 'printed'             │
//! │ HasError     │ r.id IN (error receipt ids)     │ same                             │
//! │ NotCompleted │ no result AND no error          │ (same) OR pending fiscal copy    │
//! └──────────────┴─────────────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! Sales decide "has result" by status rather than by the result row, and a
//! pending fiscal copy is re-sent even after it got a result. Close and
//! correction requests have no such status handshake.
//!
//! `First` restricts roots through a subquery instead of `LIMIT` on the
//! join, so the chosen root keeps all of its lines.

use kassa_core::status;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

use crate::aggregate::OperationKind;
use crate::records::ERROR_TABLE;
use crate::registry::JoinSchema;

/// A filtered read of one aggregate kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specification {
    /// The root with this id.
    ById(i64),
    /// Any single root; which one is unspecified.
    First,
    /// Roots the backend already acknowledged.
    HasResult,
    /// Roots with a recorded sync error.
    HasError,
    /// Roots still waiting to be sent.
    NotCompleted,
}

/// Shape of a specification's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<A> {
    Single(Option<A>),
    Set(Vec<A>),
}

impl<A> Selection<A> {
    /// The single answer; the first element of a set.
    pub fn into_single(self) -> Option<A> {
        match self {
            Selection::Single(item) => item,
            Selection::Set(items) => items.into_iter().next(),
        }
    }

    /// All answers; zero or one for single-valued specifications.
    pub fn into_vec(self) -> Vec<A> {
        match self {
            Selection::Single(item) => item.into_iter().collect(),
            Selection::Set(items) => items,
        }
    }
}

impl Specification {
    pub fn name(&self) -> &'static str {
        match self {
            Specification::ById(_) => "by_id",
            Specification::First => "first",
            Specification::HasResult => "has_result",
            Specification::HasError => "has_error",
            Specification::NotCompleted => "not_completed",
        }
    }

    /// WHERE clause for `kind`, written against the aliases of `schema`.
    pub fn predicate(&self, kind: OperationKind, schema: &JoinSchema) -> String {
        let root = schema.root();
        let root_key = format!("{}.{}", root.alias(), root.key_column());
        let result_key = format!(
            "{}.{}",
            schema.result().mapping().alias(),
            schema.result().mapping().key_column()
        );
        let errors = format!("SELECT receipt_id FROM {ERROR_TABLE}");

        match (self, kind) {
            (Specification::ById(_), _) => format!("{root_key} = ?1"),
            (Specification::First, _) => format!(
                "{root_key} IN (SELECT {} FROM {} LIMIT 1)",
                root.key_column(),
                root.table()
            ),
            (Specification::HasResult, OperationKind::Sale) => {
                format!("{}.status = '{}'", root.alias(), status::PRINTED)
            }
            (Specification::HasResult, OperationKind::Close | OperationKind::Correction) => {
                format!("{result_key} IS NOT NULL")
            }
            (Specification::HasError, _) => format!("{root_key} IN ({errors})"),
            (Specification::NotCompleted, OperationKind::Sale) => format!(
                "({result_key} IS NULL AND {root_key} NOT IN ({errors})) \
                 OR ({alias}.status = '{pending}' AND {alias}.fiscalcopy = 1)",
                alias = root.alias(),
                pending = status::PENDING,
            ),
            (Specification::NotCompleted, OperationKind::Close | OperationKind::Correction) => {
                format!("{result_key} IS NULL AND {root_key} NOT IN ({errors})")
            }
        }
    }

    /// Binds the parameters `predicate` refers to.
    pub fn bind<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            Specification::ById(id) => query.bind(*id),
            Specification::First
            | Specification::HasResult
            | Specification::HasError
            | Specification::NotCompleted => query,
        }
    }

    /// Shapes reduced aggregates into this specification's answer.
    pub fn transform<A>(&self, items: Vec<A>) -> Selection<A> {
        match self {
            Specification::ById(_) | Specification::First => {
                Selection::Single(items.into_iter().next())
            }
            Specification::HasResult | Specification::HasError | Specification::NotCompleted => {
                Selection::Set(items)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
