//! # Anonymizer
//!
//! Overwrites configured columns in every working-schema table that has
//! them. Updates run over all rows of the copy, after filtering, so nothing
//! sensitive survives into the transfer.

use crate::catalog::ColumnInfo;
use crate::copy::report::AnonymizedColumn;
use crate::copy::store::WorkingSchema;
use crate::error::Result;
use crate::job::AnonymizeSpec;
use crate::sql::{qualified, quote_ident};

/// One `UPDATE` to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymizeStatement {
    pub table: String,
    pub column: String,
    pub sql: String,
}

/// Pair each configured column with every table that has it. Columns
/// nobody configured are never touched. Output is ordered by column, then
/// table.
pub fn anonymize_statements(
    schema: &str,
    columns: &[ColumnInfo],
    spec: &AnonymizeSpec,
) -> Vec<AnonymizeStatement> {
    let mut statements = Vec::new();

    for (column, expression) in spec.iter() {
        let mut tables: Vec<&str> = columns
            .iter()
            .filter(|c| c.name == column)
            .map(|c| c.table.as_str())
            .collect();
        tables.sort_unstable();
        tables.dedup();

        for table in tables {
            statements.push(AnonymizeStatement {
                table: table.to_string(),
                column: column.to_string(),
                sql: format!(
                    "UPDATE {} SET {} = {}",
                    qualified(schema, table),
                    quote_ident(column),
                    expression
                ),
            });
        }
    }

    statements
}

/// Run every anonymizing update against the working schema.
pub async fn apply<W: WorkingSchema>(
    store: &W,
    schema: &str,
    spec: &AnonymizeSpec,
) -> Result<Vec<AnonymizedColumn>> {
    if spec.is_empty() {
        return Ok(Vec::new());
    }

    let columns = store.columns().await?;
    let statements = anonymize_statements(schema, &columns, spec);
    if statements.is_empty() {
        tracing::warn!(
            "None of the {} anonymized columns exist in schema {}",
            spec.len(),
            schema
        );
    }

    let mut report = Vec::with_capacity(statements.len());
    for statement in statements {
        tracing::debug!("{}", statement.sql);
        let rows = store.execute(&statement.table, &statement.sql).await?;
        tracing::info!(
            "Anonymized {}.{} ({} rows)",
            statement.table,
            statement.column,
            rows
        );
        report.push(AnonymizedColumn {
            table: statement.table,
            column: statement.column,
            rows,
        });
    }

    Ok(report)
}
