use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::{Result, SubsetError};
use crate::filter::where_sql;
use crate::sample::{KeySource, KeysetRequest};
use crate::sql::{qualified, quote_ident, truncate_sql};

/// Samples source tables and writes keysets into the working schema.
/// Source and working schema live in the same database.
pub struct PgKeySource {
    pool: PgPool,
    source_schema: String,
    working_schema: String,
}

impl PgKeySource {
    pub fn new(pool: PgPool, source_schema: &str, working_schema: &str) -> Self {
        Self {
            pool,
            source_schema: source_schema.to_string(),
            working_schema: working_schema.to_string(),
        }
    }

    async fn execute(&self, table: &str, sql: &str) -> Result<u64> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(|e| sql_error(table, sql, e))
    }
}

fn sql_error(table: &str, sql: &str, source: sqlx::Error) -> SubsetError {
    SubsetError::Sql {
        table: table.to_string(),
        sql_preview: truncate_sql(sql, 200),
        source,
    }
}

/// Counts which of the bound `bigint[]` keys exist.
///
/// The key column is compared uncast: `integer = bigint` is in the btree
/// integer family, so the primary-key index still serves the lookup.
pub fn probe_sql(schema: &str, table: &str, key_column: &str) -> String {
    format!(
        "SELECT COUNT(*) AS hits FROM {} WHERE {} = ANY($1::bigint[])",
        qualified(schema, table),
        quote_ident(key_column)
    )
}

/// Existing candidates from the bound `bigint[]` that pass `condition`,
/// first `limit` in the order they were offered.
pub fn keyset_select_sql(
    schema: &str,
    table: &str,
    key_column: &str,
    condition: Option<&str>,
    limit: u64,
) -> String {
    let pk = quote_ident(key_column);
    let mut sql = format!(
        "SELECT src.{pk} FROM {source} AS src \
         JOIN unnest($1::bigint[]) WITH ORDINALITY AS candidate(candidate_key, candidate_position) \
         ON src.{pk} = candidate.candidate_key",
        pk = pk,
        source = qualified(schema, table),
    );
    if let Some(condition) = condition {
        sql.push_str(&where_sql(Some(condition)));
    }
    sql.push_str(&format!(
        " ORDER BY candidate.candidate_position LIMIT {}",
        limit
    ));
    sql
}

impl KeySource for PgKeySource {
    async fn max_key(&self, table: &str, key_column: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT MAX({})::bigint AS max_key FROM {}",
            quote_ident(key_column),
            qualified(&self.source_schema, table)
        );
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| sql_error(table, &sql, e))?;

        Ok(row.get("max_key"))
    }

    async fn count_existing(&self, table: &str, key_column: &str, keys: &[i64]) -> Result<u64> {
        let sql = probe_sql(&self.source_schema, table, key_column);
        let row = sqlx::query(&sql)
            .bind(keys)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| sql_error(table, &sql, e))?;

        let hits: i64 = row.get("hits");
        Ok(hits.max(0) as u64)
    }

    async fn store_keyset(&self, request: KeysetRequest<'_>) -> Result<u64> {
        let keyset = qualified(&self.working_schema, request.keyset_table);
        let pk = quote_ident(request.key_column);

        // Dropped first so a rerun never sees a stale keyset.
        self.execute(request.table, &format!("DROP TABLE IF EXISTS {}", keyset))
            .await?;
        self.execute(request.table, &format!("CREATE TABLE {} ({} bigint)", keyset, pk))
            .await?;

        let insert = format!(
            "INSERT INTO {} ({}) {}",
            keyset,
            pk,
            keyset_select_sql(
                &self.source_schema,
                request.table,
                request.key_column,
                request.condition,
                request.limit,
            )
        );
        let stored = sqlx::query(&insert)
            .bind(request.candidates)
            .execute(&self.pool)
            .await
            .map_err(|e| sql_error(request.table, &insert, e))?
            .rows_affected();

        self.execute(request.table, &format!("CREATE INDEX ON {} ({})", keyset, pk))
            .await?;

        tracing::debug!(
            "Stored {} keys in {}.{}",
            stored,
            self.working_schema,
            request.keyset_table
        );

        Ok(stored)
    }
}
