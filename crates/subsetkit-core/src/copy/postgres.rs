use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::catalog::postgres::PgConstraintSource;
use crate::catalog::{ColumnInfo, ConstraintSource};
use crate::copy::store::WorkingSchema;
use crate::error::{Result, SubsetError};
use crate::sql::{qualified, truncate_sql};

/// The working schema, living in the source database.
pub struct PgWorkingSchema {
    pool: PgPool,
    schema: String,
    introspector: PgConstraintSource,
}

impl PgWorkingSchema {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        Self {
            introspector: PgConstraintSource::new(pool.clone()),
            pool,
            schema: schema.to_string(),
        }
    }
}

fn sql_error(table: &str, sql: &str, source: sqlx::Error) -> SubsetError {
    SubsetError::Sql {
        table: table.to_string(),
        sql_preview: truncate_sql(sql, 200),
        source,
    }
}

impl WorkingSchema for PgWorkingSchema {
    async fn execute(&self, table: &str, sql: &str) -> Result<u64> {
        tracing::debug!("{}", sql);
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(|e| sql_error(table, sql, e))
    }

    async fn execute_script(&self, sql: &str) -> Result<()> {
        tracing::debug!("{}", sql);
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| sql_error("(pre-copy statements)", sql, e))
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) AS row_count FROM {}", qualified(&self.schema, table));
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| sql_error(table, &sql, e))?;
        let count: i64 = row.get("row_count");
        Ok(count.max(0) as u64)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let query = r#"
            SELECT column_name::text AS column_name
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;
        let rows = sqlx::query(query)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SubsetError::Introspection {
                query: format!("columns of {}.{}", self.schema, table),
                source: e,
            })?;

        Ok(rows.iter().map(|row| row.get("column_name")).collect())
    }

    async fn columns(&self) -> Result<Vec<ColumnInfo>> {
        self.introspector.fetch_columns(&self.schema).await
    }
}
