//! # Bulk Transfer
//!
//! Moves a finished working-schema table into the target database. The
//! PostgreSQL implementation pipes `COPY ... TO STDOUT` on the source
//! straight into `COPY ... FROM STDIN` on the target, chunk by chunk, in
//! CSV. Nothing is buffered to disk.

use std::future::Future;

use futures::StreamExt;
use sqlx::postgres::{PgPool, PgPoolCopyExt};

use crate::copy::report::TransferReport;
use crate::error::{Result, SubsetError};
use crate::sql::{column_list, qualified};

/// Loads one table into the target, replacing whatever it held.
pub trait BulkTransfer: Send + Sync {
    fn transfer(
        &self,
        table: &str,
        columns: &[String],
    ) -> impl Future<Output = Result<TransferReport>> + Send;
}

/// `COPY`-based transfer between two PostgreSQL databases.
pub struct PgCopyTransfer {
    source: PgPool,
    target: PgPool,
    working_schema: String,
    target_schema: String,
}

impl PgCopyTransfer {
    pub fn new(source: PgPool, target: PgPool, working_schema: &str, target_schema: &str) -> Self {
        Self {
            source,
            target,
            working_schema: working_schema.to_string(),
            target_schema: target_schema.to_string(),
        }
    }
}

/// Statement that streams a working-schema table out as CSV.
pub fn export_sql(schema: &str, table: &str, columns: &[String]) -> String {
    format!(
        "COPY (SELECT {} FROM {}) TO STDOUT WITH (FORMAT csv)",
        column_list(columns),
        qualified(schema, table)
    )
}

/// Statement that loads CSV rows into a target table.
pub fn import_sql(schema: &str, table: &str, columns: &[String]) -> String {
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv)",
        qualified(schema, table),
        column_list(columns)
    )
}

fn failure(table: &str, message: &str, source: sqlx::Error) -> SubsetError {
    SubsetError::TransferFailure {
        table: table.to_string(),
        message: message.to_string(),
        source,
    }
}

impl BulkTransfer for PgCopyTransfer {
    async fn transfer(&self, table: &str, columns: &[String]) -> Result<TransferReport> {
        // CASCADE also clears target children, which are reloaded later in
        // copy order.
        let truncate = format!("TRUNCATE {} CASCADE", qualified(&self.target_schema, table));
        sqlx::query(&truncate)
            .execute(&self.target)
            .await
            .map_err(|e| failure(table, "truncating the target table failed", e))?;

        let mut sink = self
            .target
            .copy_in_raw(&import_sql(&self.target_schema, table, columns))
            .await
            .map_err(|e| failure(table, "starting the import failed", e))?;

        let mut chunks = self
            .source
            .copy_out_raw(&export_sql(&self.working_schema, table, columns))
            .await
            .map_err(|e| failure(table, "starting the export failed", e))?;

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = sink.abort("export from the working schema failed").await;
                    return Err(failure(table, "reading exported rows failed", e));
                }
            };
            let sent = sink.send(chunk).await.map(|_| ());
            if let Err(e) = sent {
                let _ = sink.abort("import into the target failed").await;
                return Err(failure(table, "writing rows to the target failed", e));
            }
        }

        let rows = sink
            .finish()
            .await
            .map_err(|e| failure(table, "finishing the import failed", e))?;

        tracing::info!(
            "Transferred {} rows into {}.{}",
            rows,
            self.target_schema,
            table
        );

        Ok(TransferReport {
            table: table.to_string(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "email".to_string()]
    }

    #[test]
    fn test_export_reads_the_working_copy() {
        assert_eq!(
            export_sql("work", "members", &columns()),
            "COPY (SELECT \"id\", \"email\" FROM \"work\".\"members\") TO STDOUT WITH (FORMAT csv)"
        );
    }

    #[test]
    fn test_import_names_the_same_columns() {
        assert_eq!(
            import_sql("public", "members", &columns()),
            "COPY \"public\".\"members\" (\"id\", \"email\") FROM STDIN WITH (FORMAT csv)"
        );
    }
}
