//! # Aggregates
//!
//! What the generic repository needs to know about a root record: where it
//! lives, which children it owns and how to put it back together.
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │  root (alias r)      │ 1──1 │  result (alias re)   │  optional
//! │  SaleRequest         │      │  OperationResult     │
//! │  CloseRequest        │      └──────────────────────┘
//! │  CorrectionRequest   │      ┌──────────────────────┐
//! │                      │ 1──* │  lines (alias l)     │  Sale only
//! └──────────────────────┘      └──────────────────────┘
//! ```

use std::fmt;

use kassa_core::validation::ValidationResult;
use kassa_core::OperationResult;

use crate::mapping::{AliasedRow, FieldColumn, FieldValue, Record};

/// The three kinds of operation request the store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Sale,
    Close,
    Correction,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Sale => "sale",
            OperationKind::Close => "close",
            OperationKind::Correction => "correction",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A root record together with its owned children.
///
/// The root's own `Record` impl covers header columns only; `lines` and
/// `result` are written to their tables separately and re-attached by
/// [`Aggregate::assemble`] when rows are reduced.
pub trait Aggregate: Record + Clone + fmt::Debug + Send + Sync + Unpin + 'static {
    /// Child row type (`NoLines` for kinds without children).
    type Line: Record + Clone + fmt::Debug + Send + Sync + Unpin + 'static;

    const KIND: OperationKind;
    const TABLE: &'static str;
    const RESULT_TABLE: &'static str;
    const LINE_TABLE: Option<&'static str>;

    /// Root identity.
    fn id(&self) -> i64;

    fn lines(&self) -> &[Self::Line];

    fn result(&self) -> Option<&OperationResult>;

    /// Structural checks run before any write.
    fn validate(&self) -> ValidationResult<()>;

    /// Rebuilds the aggregate from a decoded header and its children.
    fn assemble(self, lines: Vec<Self::Line>, result: Option<OperationResult>) -> Self;
}

/// Child type of aggregates that own no lines. Cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoLines {}

impl Record for NoLines {
    const FIELDS: &'static [FieldColumn] = &[];

    fn values(&self) -> Vec<FieldValue> {
        match *self {}
    }

    fn decode(_row: &AliasedRow<'_>) -> Result<Self, sqlx::Error> {
        Err(sqlx::Error::ColumnNotFound("line table".to_string()))
    }
}
