use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::catalog::{ColumnInfo, ConstraintSource, ForeignKeyEdge};
use crate::error::{Result, SubsetError};

/// Reads tables, columns and foreign keys from PostgreSQL system catalogs.
pub struct PgConstraintSource {
    pool: PgPool,
}

impl PgConstraintSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ConstraintSource for PgConstraintSource {
    async fn fetch_tables(&self, schema: &str) -> Result<Vec<String>> {
        let query = "SELECT table_name::text AS table_name FROM information_schema.tables WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name";
        let rows = sqlx::query(query)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SubsetError::Introspection {
                query: "fetch tables".to_string(),
                source: e,
            })?;

        Ok(rows.iter().map(|row| row.get("table_name")).collect())
    }

    async fn fetch_foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyEdge>> {
        // unnest(conkey, confkey) pairs composite key columns positionally.
        let query = r#"
            SELECT
                child.relname::text AS table_name,
                child_att.attname::text AS column_name,
                parent.relname::text AS parent_table,
                parent_att.attname::text AS parent_column
            FROM pg_constraint c
            JOIN pg_class child ON child.oid = c.conrelid
            JOIN pg_namespace child_ns ON child_ns.oid = child.relnamespace
            JOIN pg_class parent ON parent.oid = c.confrelid
            JOIN pg_namespace parent_ns ON parent_ns.oid = parent.relnamespace
            CROSS JOIN LATERAL unnest(c.conkey, c.confkey) AS k(attnum, parent_attnum)
            JOIN pg_attribute child_att
                ON child_att.attrelid = c.conrelid
                AND child_att.attnum = k.attnum
            JOIN pg_attribute parent_att
                ON parent_att.attrelid = c.confrelid
                AND parent_att.attnum = k.parent_attnum
            WHERE c.contype = 'f'
                AND child_ns.nspname = $1
                AND parent_ns.nspname = $1
            ORDER BY table_name, column_name
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SubsetError::Introspection {
                query: "fetch foreign keys".to_string(),
                source: e,
            })?;

        Ok(rows
            .iter()
            .map(|row| ForeignKeyEdge {
                child_table: row.get("table_name"),
                child_column: row.get("column_name"),
                parent_table: row.get("parent_table"),
                parent_column: row.get("parent_column"),
            })
            .collect())
    }

    async fn fetch_columns(&self, schema: &str) -> Result<Vec<ColumnInfo>> {
        let query = r#"
            SELECT
                c.table_name::text AS table_name,
                c.column_name::text AS column_name,
                c.column_default::text AS column_default,
                c.is_nullable::text AS is_nullable,
                c.data_type::text AS data_type
            FROM information_schema.columns c
            WHERE c.table_schema = $1
            ORDER BY c.table_name, c.ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SubsetError::Introspection {
                query: "fetch columns".to_string(),
                source: e,
            })?;

        Ok(rows
            .iter()
            .map(|row| {
                let is_nullable: String = row.get("is_nullable");
                ColumnInfo {
                    table: row.get("table_name"),
                    name: row.get("column_name"),
                    default: row.get("column_default"),
                    nullable: is_nullable == "YES",
                    data_type: row.get("data_type"),
                }
            })
            .collect())
    }
}
