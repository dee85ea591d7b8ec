//! Statements the orchestrator runs against the working schema, and the
//! trait it runs them through.

use std::future::Future;

use crate::catalog::ColumnInfo;
use crate::error::Result;
use crate::filter::where_sql;
use crate::sql::{column_list, quote_ident};

/// Access to the database holding the source schema and the working schema.
pub trait WorkingSchema: Send + Sync {
    /// Run one statement. `table` names the table it concerns, for errors.
    /// Returns the number of rows affected.
    fn execute(&self, table: &str, sql: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Run a raw block that may hold several statements.
    fn execute_script(&self, sql: &str) -> impl Future<Output = Result<()>> + Send;

    /// Current row count of a working-schema table.
    fn count_rows(&self, table: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Columns of a working-schema table, in ordinal order. Empty when the
    /// table doesn't exist.
    fn table_columns(&self, table: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Every column of every table in the working schema.
    fn columns(&self) -> impl Future<Output = Result<Vec<ColumnInfo>>> + Send;
}

pub fn drop_schema_sql(schema: &str) -> String {
    format!("DROP SCHEMA IF EXISTS {} CASCADE", quote_ident(schema))
}

pub fn create_schema_sql(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema))
}

/// Both arguments are already qualified and quoted.
pub fn create_copy_table_sql(copy: &str, source: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (LIKE {} INCLUDING INDEXES)",
        copy, source
    )
}

pub fn truncate_table_sql(copy: &str) -> String {
    format!("TRUNCATE {}", copy)
}

pub fn insert_sql(copy: &str, source: &str, columns: &[String], filter: Option<&str>) -> String {
    let columns = column_list(columns);
    format!(
        "INSERT INTO {copy} ({columns}) SELECT {columns} FROM {source}{filter}",
        copy = copy,
        columns = columns,
        source = source,
        filter = where_sql(filter),
    )
}
