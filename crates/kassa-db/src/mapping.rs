//! # Column Mappings
//!
//! Declared field ↔ column metadata for every persisted record, and the
//! validated per-table view the SQL builder and row reducer work from.
//!
//! ## Binding Slots
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Record::FIELDS (declaration order)                                     │
//! │                                                                         │
//! │   #   field               column          slot   join alias             │
//! │   1   id                  id              ?1     r_id                   │
//! │   2   account_id          account_id      ?2     r_account_id           │
//! │   3   fiscal_copy         fiscalcopy      ?3     r_fiscal_copy          │
//! │   …                                                                     │
//! │                                                                         │
//! │  Record::values() yields one FieldValue per entry, same order, so one  │
//! │  value list binds INSERT (VALUES ?1, ?2 …) and UPDATE (col = ?N) alike │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite through sqlx only accepts positional parameters (`?NNN`), so a
//! field's binding name is its slot number.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use kassa_core::{OperationType, TaxCode};
use sqlx::query::Query;
use sqlx::query_builder::Separated;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Decode, Row, Sqlite, Type};

use crate::error::{DbError, DbResult};

// =============================================================================
// Field Metadata
// =============================================================================

/// One in-memory field and the column it is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldColumn {
    pub field: &'static str,
    pub column: &'static str,
}

/// Shorthand for building mapping tables.
pub const fn field(field: &'static str, column: &'static str) -> FieldColumn {
    FieldColumn { field, column }
}

/// A value ready to be bound to one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(Option<i64>),
    Boolean(Option<bool>),
    Text(Option<String>),
    Timestamp(Option<DateTime<Utc>>),
}

impl FieldValue {
    /// Binds this value to the next positional parameter of `query`.
    pub(crate) fn bind_to<'q>(
        self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            FieldValue::Integer(v) => query.bind(v),
            FieldValue::Boolean(v) => query.bind(v),
            FieldValue::Text(v) => query.bind(v),
            FieldValue::Timestamp(v) => query.bind(v),
        }
    }

    /// Binds this value inside a multi-row `VALUES` tuple.
    pub(crate) fn push_to<'qb, 'args: 'qb>(
        self,
        tuple: &mut Separated<'qb, 'args, Sqlite, &'static str>,
    ) {
        match self {
            FieldValue::Integer(v) => tuple.push_bind(v),
            FieldValue::Boolean(v) => tuple.push_bind(v),
            FieldValue::Text(v) => tuple.push_bind(v),
            FieldValue::Timestamp(v) => tuple.push_bind(v),
        };
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(Some(v))
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(v: Option<i64>) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(Some(i64::from(v)))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(Some(v))
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(Some(v.to_string()))
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::Text(Some(v.clone()))
    }
}

impl From<&Option<String>> for FieldValue {
    fn from(v: &Option<String>) -> Self {
        FieldValue::Text(v.clone())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(Some(v))
    }
}

impl From<Option<DateTime<Utc>>> for FieldValue {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl From<TaxCode> for FieldValue {
    fn from(v: TaxCode) -> Self {
        FieldValue::Text(Some(v.as_str().to_string()))
    }
}

impl From<OperationType> for FieldValue {
    fn from(v: OperationType) -> Self {
        FieldValue::Text(Some(v.as_str().to_string()))
    }
}

// =============================================================================
// Record
// =============================================================================

/// A type stored as one row of one table.
///
/// `FIELDS` and `values()` must list the same fields in the same order; the
/// binder rejects a record whose value count disagrees with its metadata.
pub trait Record: Sized {
    /// Declared field/column pairs in binding order.
    const FIELDS: &'static [FieldColumn];

    /// Values in `FIELDS` order.
    fn values(&self) -> Vec<FieldValue>;

    /// Decodes the record from columns aliased `{alias}_{field}`.
    fn decode(row: &AliasedRow<'_>) -> Result<Self, sqlx::Error>;
}

/// Read access to one table's columns inside a joined row.
pub struct AliasedRow<'r> {
    row: &'r SqliteRow,
    alias: &'r str,
}

impl<'r> AliasedRow<'r> {
    pub fn new(row: &'r SqliteRow, alias: &'r str) -> Self {
        AliasedRow { row, alias }
    }

    fn column(&self, field: &str) -> String {
        format!("{}_{}", self.alias, field)
    }

    /// Decodes the column aliased for `field`.
    pub fn get<T>(&self, field: &str) -> Result<T, sqlx::Error>
    where
        T: Decode<'r, Sqlite> + Type<Sqlite>,
    {
        self.row.try_get(self.column(field).as_str())
    }

    /// Decodes a text column through `FromStr` (enums stored by name).
    pub fn parse<T>(&self, field: &str) -> Result<T, sqlx::Error>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw: String = self.get(field)?;
        raw.parse().map_err(|err: T::Err| sqlx::Error::ColumnDecode {
            index: self.column(field),
            source: Box::new(err),
        })
    }

    /// Sentinel check: true when the aliased key column is non-null.
    pub fn is_present(&self, key_field: &str) -> Result<bool, sqlx::Error> {
        Ok(self.get::<Option<i64>>(key_field)?.is_some())
    }
}

// =============================================================================
// Table Mapping
// =============================================================================

/// Validated mapping of one record type onto one aliased table.
#[derive(Debug, Clone)]
pub struct TableMapping {
    table: &'static str,
    alias: &'static str,
    key: FieldColumn,
    key_slot: usize,
    fields: &'static [FieldColumn],
}

impl TableMapping {
    /// Builds the mapping of `R` onto `table`, failing fast on bad metadata.
    pub fn of<R: Record>(
        table: &'static str,
        alias: &'static str,
        key_field: &str,
    ) -> DbResult<Self> {
        Self::new(table, alias, key_field, R::FIELDS)
    }

    /// Validates raw metadata.
    ///
    /// ## Rejected
    /// - blank table name or alias
    /// - empty field list
    /// - blank or duplicate field / column names
    /// - key field absent from the list
    pub fn new(
        table: &'static str,
        alias: &'static str,
        key_field: &str,
        fields: &'static [FieldColumn],
    ) -> DbResult<Self> {
        if table.trim().is_empty() || alias.trim().is_empty() {
            return Err(DbError::configuration(format!(
                "table '{table}' needs a name and an alias"
            )));
        }
        if fields.is_empty() {
            return Err(DbError::configuration(format!(
                "table '{table}' has no mapped fields"
            )));
        }

        let mut seen_fields = HashSet::new();
        let mut seen_columns = HashSet::new();
        for fc in fields {
            if fc.field.trim().is_empty() || fc.column.trim().is_empty() {
                return Err(DbError::configuration(format!(
                    "table '{table}' has an incomplete mapping: {fc:?}"
                )));
            }
            if !seen_fields.insert(fc.field) {
                return Err(DbError::configuration(format!(
                    "table '{table}' maps field '{}' twice",
                    fc.field
                )));
            }
            if !seen_columns.insert(fc.column) {
                return Err(DbError::configuration(format!(
                    "table '{table}' maps column '{}' twice",
                    fc.column
                )));
            }
        }

        let key_slot = fields
            .iter()
            .position(|fc| fc.field == key_field)
            .ok_or_else(|| {
                DbError::configuration(format!(
                    "table '{table}' does not map its key field '{key_field}'"
                ))
            })?;

        Ok(TableMapping {
            table,
            alias,
            key: fields[key_slot],
            key_slot: key_slot + 1,
            fields,
        })
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn alias(&self) -> &'static str {
        self.alias
    }

    pub fn fields(&self) -> &'static [FieldColumn] {
        self.fields
    }

    /// Field name of the key (also the sentinel field in joins).
    pub fn key_field(&self) -> &'static str {
        self.key.field
    }

    pub fn key_column(&self) -> &'static str {
        self.key.column
    }

    /// `c1, c2, …`
    pub fn columns(&self) -> String {
        self.fields
            .iter()
            .map(|fc| fc.column)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `?1, ?2, …`
    pub fn placeholders(&self) -> String {
        (1..=self.fields.len())
            .map(|slot| format!("?{slot}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `c1 = ?1, c2 = ?2, …`
    pub fn assignments(&self) -> String {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, fc)| format!("{} = ?{}", fc.column, i + 1))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Placeholder carrying the key value in the UPDATE statement.
    pub fn key_placeholder(&self) -> String {
        format!("?{}", self.key_slot)
    }

    /// `{alias}_{field}`
    pub fn alias_of(&self, field: &str) -> String {
        format!("{}_{}", self.alias, field)
    }

    /// `alias.column AS alias_field` for every mapped field.
    pub fn select_list(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|fc| format!("{}.{} AS {}", self.alias, fc.column, self.alias_of(fc.field)))
            .collect()
    }

    /// Rejects a value list that does not line up with the metadata.
    pub fn check_values(&self, values: &[FieldValue]) -> DbResult<()> {
        if values.len() != self.fields.len() {
            return Err(DbError::configuration(format!(
                "table '{}' maps {} fields but a record produced {} values",
                self.table,
                self.fields.len(),
                values.len()
            )));
        }
        Ok(())
    }

    /// Binds every field value of `record` in slot order.
    pub fn bind_record<'q, R: Record>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        record: &R,
    ) -> DbResult<Query<'q, Sqlite, SqliteArguments<'q>>> {
        let values = record.values();
        self.check_values(&values)?;
        Ok(values
            .into_iter()
            .fold(query, |query, value| value.bind_to(query)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
