//! # Error Types
//!
//! Defines `SubsetError`, the unified error enum for every failure mode in
//! the subsetting pipeline. Variants carry the table name and a preview of
//! the offending SQL where there is one, so a failed run can be diagnosed
//! from the message alone.

use thiserror::Error;

/// All errors that can occur in SubsetKit operations.
#[derive(Error, Debug)]
pub enum SubsetError {
    #[error("Database connection failed: {message}\n  Connection string: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Schema introspection failed on query '{query}': {source}")]
    Introspection {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("No {side} database URL provided. SubsetKit looks for a connection in this order:\n  1. --{side} flag\n  2. {env_var} environment variable\n  3. .env file with {env_var}\n  4. subsetkit.toml [{side}] section")]
    NoDatabaseUrl { side: String, env_var: String },

    #[error("Couldn't find an order to copy all tables. Still remaining: {}\n  Cycles: {}", .remaining.join(", "), format_cycles(.cycles))]
    CyclicDependency {
        /// Every table left unresolved once no table qualified for extraction.
        remaining: Vec<String>,
        /// Strongly connected components among `remaining` (the actual cycles).
        cycles: Vec<Vec<String>>,
    },

    #[error("SQL failed on {table}: {source}\n  SQL: {sql_preview}")]
    Sql {
        table: String,
        sql_preview: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Transfer of {table} to the target failed: {message}: {source}")]
    TransferFailure {
        table: String,
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Table '{table}' has no copy in working schema '{schema}'")]
    UnknownTable { table: String, schema: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    if cycles.is_empty() {
        return "none detected".to_string();
    }
    cycles
        .iter()
        .map(|c| format!("[{}]", c.join(" -> ")))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, SubsetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_names_remaining_tables() {
        let err = SubsetError::CyclicDependency {
            remaining: vec!["a".to_string(), "b".to_string()],
            cycles: vec![vec!["a".to_string(), "b".to_string()]],
        };
        let msg = err.to_string();
        assert!(msg.contains("a, b"), "{}", msg);
        assert!(msg.contains("[a -> b]"), "{}", msg);
    }
}
