//! # SQL Builder
//!
//! Pure functions turning validated mappings into statement text. Nothing
//! here touches a connection; output for a given mapping never changes.
//!
//! ## Join Shape
//! ```text
//! SELECT r.id AS r_id, …, re.receipt_id AS re_receipt_id, l.id AS l_id, …
//! FROM <root> r
//! LEFT JOIN <result> re ON re.receipt_id = r.id
//! LEFT JOIN <lines>  l  ON l.receipt_id  = r.id
//! [WHERE <predicate>]
//! ```
//!
//! A root with N lines produces N rows (one with NULL `l_*` columns when it
//! has none); the reducer folds them back into one aggregate.

use crate::mapping::TableMapping;
use crate::registry::JoinSchema;

/// `INSERT INTO t (c1, …) VALUES (?1, …)`
pub fn insert(mapping: &TableMapping) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        mapping.table(),
        mapping.columns(),
        mapping.placeholders()
    )
}

/// `INSERT INTO t (c1, …) ` followed by a multi-row `VALUES` list.
pub fn insert_prefix(mapping: &TableMapping) -> String {
    format!("INSERT INTO {} ({}) ", mapping.table(), mapping.columns())
}

/// `UPDATE t SET c1 = ?1, … WHERE key = ?K`
pub fn update(mapping: &TableMapping) -> String {
    format!(
        "UPDATE {} SET {} WHERE {} = {}",
        mapping.table(),
        mapping.assignments(),
        mapping.key_column(),
        mapping.key_placeholder()
    )
}

/// `DELETE FROM t WHERE column = ?1`
pub fn delete_by_key(table: &str, column: &str) -> String {
    format!("DELETE FROM {table} WHERE {column} = ?1")
}

/// `SELECT <aliased columns> FROM t alias`
pub fn select(mapping: &TableMapping) -> String {
    format!(
        "SELECT {} FROM {} {}",
        mapping.select_list().join(", "),
        mapping.table(),
        mapping.alias()
    )
}

/// Root joined with its result and lines, every column aliased.
pub fn join_select(schema: &JoinSchema) -> String {
    let root = schema.root();
    let mut columns = root.select_list();
    let mut joins = String::new();

    for joined in schema.children() {
        columns.extend(joined.mapping().select_list());
        joins.push_str(&format!(
            " LEFT JOIN {table} {alias} ON {alias}.{fk} = {root_alias}.{root_key}",
            table = joined.mapping().table(),
            alias = joined.mapping().alias(),
            fk = joined.parent_column(),
            root_alias = root.alias(),
            root_key = root.key_column(),
        ));
    }

    format!(
        "SELECT {} FROM {} {}{}",
        columns.join(", "),
        root.table(),
        root.alias(),
        joins
    )
}

/// [`join_select`] restricted by `predicate`.
pub fn join_select_where(schema: &JoinSchema, predicate: &str) -> String {
    format!("{} WHERE {}", join_select(schema), predicate)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{field, FieldColumn};
    use crate::registry::Joined;

    const ROOT: &[FieldColumn] = &[field("id", "id"), field("status", "status")];
    const RESULT: &[FieldColumn] = &[field("receipt_id", "receipt_id")];
    const LINES: &[FieldColumn] = &[
        field("id", "id"),
        field("receipt_id", "receipt_id"),
        field("title", "title"),
    ];

    fn root() -> TableMapping {
        TableMapping::new("requests", "r", "id", ROOT).unwrap()
    }

    fn schema(with_lines: bool) -> JoinSchema {
        let result = Joined::new(
            TableMapping::new("results", "re", "receipt_id", RESULT).unwrap(),
            "receipt_id",
        );
        let lines = with_lines.then(|| {
            Joined::new(
                TableMapping::new("lines", "l", "id", LINES).unwrap(),
                "receipt_id",
            )
        });
        JoinSchema::new(root(), result, lines).unwrap()
    }

    #[test]
    fn test_insert() {
        assert_eq!(
            insert(&root()),
            "INSERT INTO requests (id, status) VALUES (?1, ?2)"
        );
        assert_eq!(insert_prefix(&root()), "INSERT INTO requests (id, status) ");
    }

    #[test]
    fn test_update_binds_key_by_slot() {
        assert_eq!(
            update(&root()),
            "UPDATE requests SET id = ?1, status = ?2 WHERE id = ?1"
        );
    }

    #[test]
    fn test_delete_by_key() {
        assert_eq!(
            delete_by_key("lines", "receipt_id"),
            "DELETE FROM lines WHERE receipt_id = ?1"
        );
    }

    #[test]
    fn test_join_select_orders_root_result_lines() {
        assert_eq!(
            join_select(&schema(true)),
            "SELECT r.id AS r_id, r.status AS r_status, \
             re.receipt_id AS re_receipt_id, \
             l.id AS l_id, l.receipt_id AS l_receipt_id, l.title AS l_title \
             FROM requests r \
             LEFT JOIN results re ON re.receipt_id = r.id \
             LEFT JOIN lines l ON l.receipt_id = r.id"
        );
    }

    #[test]
    fn test_join_select_without_lines() {
        assert_eq!(
            join_select_where(&schema(false), "r.id = ?1"),
            "SELECT r.id AS r_id, r.status AS r_status, re.receipt_id AS re_receipt_id \
             FROM requests r \
             LEFT JOIN results re ON re.receipt_id = r.id \
             WHERE r.id = ?1"
        );
    }

    #[test]
    fn test_plain_select() {
        assert_eq!(
            select(&root()),
            "SELECT r.id AS r_id, r.status AS r_status FROM requests r"
        );
    }
}
