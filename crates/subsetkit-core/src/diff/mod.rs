//! # Schema Diff
//!
//! Read-only comparison of the source and target schemas: columns present
//! on one side only, columns whose default, nullability or type differ, and
//! foreign keys declared on one side only. Run before a transfer to spot
//! tables that won't load cleanly.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::catalog::{ColumnInfo, ForeignKeyEdge};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnChange {
    pub table: String,
    pub column: String,
    /// Which attribute differs: `type`, `nullable` or `default`.
    pub attribute: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDiff {
    pub source_only_columns: Vec<ColumnRef>,
    pub target_only_columns: Vec<ColumnRef>,
    pub changed_columns: Vec<ColumnChange>,
    pub source_only_foreign_keys: Vec<ForeignKeyEdge>,
    pub target_only_foreign_keys: Vec<ForeignKeyEdge>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.source_only_columns.is_empty()
            && self.target_only_columns.is_empty()
            && self.changed_columns.is_empty()
            && self.source_only_foreign_keys.is_empty()
            && self.target_only_foreign_keys.is_empty()
    }

    /// Human-readable summary for terminal output.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "Source and target schemas match.".to_string();
        }

        let mut lines = vec!["Source and target schemas differ:".to_string()];

        for c in &self.source_only_columns {
            lines.push(format!("  < column: {}.{}", c.table, c.column));
        }
        for c in &self.target_only_columns {
            lines.push(format!("  > column: {}.{}", c.table, c.column));
        }
        for c in &self.changed_columns {
            lines.push(format!(
                "  ~ {}.{}: {} {} -> {}",
                c.table, c.column, c.attribute, c.source, c.target
            ));
        }
        for fk in &self.source_only_foreign_keys {
            lines.push(format!("  < foreign key: {}", fk));
        }
        for fk in &self.target_only_foreign_keys {
            lines.push(format!("  > foreign key: {}", fk));
        }

        lines.join("\n")
    }
}

fn index(columns: &[ColumnInfo]) -> BTreeMap<(&str, &str), &ColumnInfo> {
    columns
        .iter()
        .map(|c| ((c.table.as_str(), c.name.as_str()), c))
        .collect()
}

fn describe_default(default: &Option<String>) -> String {
    default.clone().unwrap_or_else(|| "(none)".to_string())
}

/// Compare source against target. Output lists are sorted.
pub fn diff_schemas(
    source_columns: &[ColumnInfo],
    target_columns: &[ColumnInfo],
    source_fks: &[ForeignKeyEdge],
    target_fks: &[ForeignKeyEdge],
) -> SchemaDiff {
    let source = index(source_columns);
    let target = index(target_columns);
    let mut diff = SchemaDiff::default();

    for (&(table, column), source_col) in &source {
        let Some(target_col) = target.get(&(table, column)) else {
            diff.source_only_columns.push(ColumnRef {
                table: table.to_string(),
                column: column.to_string(),
            });
            continue;
        };

        let mut changed = |attribute: &str, source: String, target: String| {
            diff.changed_columns.push(ColumnChange {
                table: table.to_string(),
                column: column.to_string(),
                attribute: attribute.to_string(),
                source,
                target,
            });
        };

        if source_col.data_type != target_col.data_type {
            changed(
                "type",
                source_col.data_type.clone(),
                target_col.data_type.clone(),
            );
        }
        if source_col.nullable != target_col.nullable {
            changed(
                "nullable",
                source_col.nullable.to_string(),
                target_col.nullable.to_string(),
            );
        }
        if source_col.default != target_col.default {
            changed(
                "default",
                describe_default(&source_col.default),
                describe_default(&target_col.default),
            );
        }
    }

    for &(table, column) in target.keys() {
        if !source.contains_key(&(table, column)) {
            diff.target_only_columns.push(ColumnRef {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
    }

    let source_fks: BTreeSet<&ForeignKeyEdge> = source_fks.iter().collect();
    let target_fks: BTreeSet<&ForeignKeyEdge> = target_fks.iter().collect();
    diff.source_only_foreign_keys = source_fks
        .difference(&target_fks)
        .map(|fk| (*fk).clone())
        .collect();
    diff.target_only_foreign_keys = target_fks
        .difference(&source_fks)
        .map(|fk| (*fk).clone())
        .collect();

    diff
}
