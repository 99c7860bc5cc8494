//! # Mapping Registry
//!
//! Every table mapping the store uses, validated together once at startup.
//!
//! ## Lifecycle
//! ```text
//! Database::new(config)
//!      │
//!      ▼
//! Registry::build() ── bad metadata? ──► DbError::Configuration (no pool handed out)
//!      │
//!      ▼
//! Arc<Registry> shared by every repository (read-only from here on)
//! ```

use std::collections::HashSet;

use kassa_core::{
    CloseRequest, CorrectionRequest, OperationRequestError, OperationResult, SaleRequest,
};

use crate::aggregate::{Aggregate, OperationKind};
use crate::error::{DbError, DbResult};
use crate::mapping::TableMapping;
use crate::records::ERROR_TABLE;
use crate::sql;

/// Alias of the root table in joins.
pub const ROOT_ALIAS: &str = "r";
/// Alias of the result table in joins.
pub const RESULT_ALIAS: &str = "re";
/// Alias of the line table in joins.
pub const LINE_ALIAS: &str = "l";
/// Alias of the error table.
pub const ERROR_ALIAS: &str = "e";

/// Column in child tables pointing at the root id.
const PARENT_COLUMN: &str = "receipt_id";

/// A child table joined onto the root.
#[derive(Debug, Clone)]
pub struct Joined {
    mapping: TableMapping,
    parent_column: &'static str,
}

impl Joined {
    pub fn new(mapping: TableMapping, parent_column: &'static str) -> Self {
        Joined {
            mapping,
            parent_column,
        }
    }

    pub fn mapping(&self) -> &TableMapping {
        &self.mapping
    }

    pub fn parent_column(&self) -> &'static str {
        self.parent_column
    }

    /// Alias of the key column, non-null exactly when a child row joined.
    pub fn sentinel(&self) -> String {
        self.mapping.alias_of(self.mapping.key_field())
    }
}

/// Precomputed statement text for one aggregate kind.
#[derive(Debug, Clone)]
pub struct Statements {
    pub insert_root: String,
    pub insert_root_prefix: String,
    pub update_root: String,
    pub delete_root: String,
    pub insert_result: String,
    pub insert_result_prefix: String,
    pub delete_result: String,
    pub insert_line_prefix: Option<String>,
    pub delete_lines: Option<String>,
    pub select: String,
}

/// Root table joined with its result table and, for sales, its lines.
#[derive(Debug, Clone)]
pub struct JoinSchema {
    root: TableMapping,
    result: Joined,
    lines: Option<Joined>,
    statements: Statements,
}

impl JoinSchema {
    /// Validates that no two select columns share an alias.
    pub fn new(root: TableMapping, result: Joined, lines: Option<Joined>) -> DbResult<Self> {
        let mut table_aliases = HashSet::new();
        let mut column_aliases = HashSet::new();

        let mappings = std::iter::once(&root)
            .chain(std::iter::once(result.mapping()))
            .chain(lines.as_ref().map(Joined::mapping));

        for mapping in mappings {
            if !table_aliases.insert(mapping.alias()) {
                return Err(DbError::configuration(format!(
                    "alias '{}' used by more than one table in the {} join",
                    mapping.alias(),
                    root.table()
                )));
            }
            for fc in mapping.fields() {
                let alias = mapping.alias_of(fc.field);
                if !column_aliases.insert(alias.clone()) {
                    return Err(DbError::configuration(format!(
                        "column alias '{alias}' is ambiguous in the {} join",
                        root.table()
                    )));
                }
            }
        }

        let statements = Statements {
            insert_root: sql::insert(&root),
            insert_root_prefix: sql::insert_prefix(&root),
            update_root: sql::update(&root),
            delete_root: sql::delete_by_key(root.table(), root.key_column()),
            insert_result: sql::insert(result.mapping()),
            insert_result_prefix: sql::insert_prefix(result.mapping()),
            delete_result: sql::delete_by_key(result.mapping().table(), result.parent_column()),
            insert_line_prefix: lines.as_ref().map(|l| sql::insert_prefix(l.mapping())),
            delete_lines: lines
                .as_ref()
                .map(|l| sql::delete_by_key(l.mapping().table(), l.parent_column())),
            select: String::new(),
        };

        let mut schema = JoinSchema {
            root,
            result,
            lines,
            statements,
        };
        schema.statements.select = sql::join_select(&schema);
        Ok(schema)
    }

    /// Standard schema for an aggregate kind.
    pub fn of<A: Aggregate>() -> DbResult<Self> {
        let root = TableMapping::of::<A>(A::TABLE, ROOT_ALIAS, "id")?;
        let result = Joined::new(
            TableMapping::of::<OperationResult>(A::RESULT_TABLE, RESULT_ALIAS, "receipt_id")?,
            PARENT_COLUMN,
        );
        let lines = match A::LINE_TABLE {
            Some(table) => Some(Joined::new(
                TableMapping::of::<A::Line>(table, LINE_ALIAS, "id")?,
                PARENT_COLUMN,
            )),
            None => None,
        };
        Self::new(root, result, lines)
    }

    pub fn root(&self) -> &TableMapping {
        &self.root
    }

    pub fn result(&self) -> &Joined {
        &self.result
    }

    pub fn lines(&self) -> Option<&Joined> {
        self.lines.as_ref()
    }

    /// Joined tables in select order: result, then lines.
    pub fn children(&self) -> impl Iterator<Item = &Joined> {
        std::iter::once(&self.result).chain(self.lines.as_ref())
    }

    pub fn statements(&self) -> &Statements {
        &self.statements
    }
}

/// All mappings of the store.
#[derive(Debug, Clone)]
pub struct Registry {
    sale: JoinSchema,
    close: JoinSchema,
    correction: JoinSchema,
    errors: TableMapping,
}

impl Registry {
    /// Builds and validates every mapping.
    pub fn build() -> DbResult<Self> {
        Ok(Registry {
            sale: JoinSchema::of::<SaleRequest>()?,
            close: JoinSchema::of::<CloseRequest>()?,
            correction: JoinSchema::of::<CorrectionRequest>()?,
            errors: TableMapping::of::<OperationRequestError>(
                ERROR_TABLE,
                ERROR_ALIAS,
                "receipt_request_id",
            )?,
        })
    }

    pub fn schema(&self, kind: OperationKind) -> &JoinSchema {
        match kind {
            OperationKind::Sale => &self.sale,
            OperationKind::Close => &self.close,
            OperationKind::Correction => &self.correction,
        }
    }

    pub fn errors(&self) -> &TableMapping {
        &self.errors
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
