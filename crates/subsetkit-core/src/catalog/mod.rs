//! # Foreign-Key Catalog
//!
//! The set of foreign-key edges a job works from. Edges are discovered from
//! one database's declared constraints, merged with manually declared links,
//! and filtered: self-references and anything touching an excluded table are
//! dropped. A catalog is built once per job and never changes afterwards.

pub mod postgres;

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which database a catalog was read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// A single-column foreign key: `child_table.child_column` references
/// `parent_table.parent_column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    pub child_table: String,
    pub child_column: String,
    pub parent_table: String,
    pub parent_column: String,
}

impl ForeignKeyEdge {
    pub fn new(
        child_table: impl Into<String>,
        child_column: impl Into<String>,
        parent_table: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        Self {
            child_table: child_table.into(),
            child_column: child_column.into(),
            parent_table: parent_table.into(),
            parent_column: parent_column.into(),
        }
    }

    pub fn is_self_reference(&self) -> bool {
        self.child_table == self.parent_table
    }

    pub fn touches_any(&self, tables: &BTreeSet<String>) -> bool {
        tables.contains(&self.child_table) || tables.contains(&self.parent_table)
    }
}

impl fmt::Display for ForeignKeyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.child_table, self.child_column, self.parent_table, self.parent_column
        )
    }
}

/// Column metadata as returned by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub table: String,
    pub name: String,
    pub default: Option<String>,
    pub nullable: bool,
    pub data_type: String,
}

/// Trait for reading constraint and column metadata from a database.
pub trait ConstraintSource: Send + Sync {
    /// Every base table in `schema`, sorted by name.
    fn fetch_tables(&self, schema: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Every foreign key in `schema`, one edge per column pair.
    fn fetch_foreign_keys(
        &self,
        schema: &str,
    ) -> impl Future<Output = Result<Vec<ForeignKeyEdge>>> + Send;

    /// Every column in `schema`, ordered by table then ordinal position.
    fn fetch_columns(&self, schema: &str) -> impl Future<Output = Result<Vec<ColumnInfo>>> + Send;
}

/// Immutable, filtered view of one database's foreign keys.
#[derive(Debug, Clone)]
pub struct Catalog {
    side: Side,
    tables: Vec<String>,
    edges: Vec<ForeignKeyEdge>,
}

impl Catalog {
    /// Merge discovered and manual edges, then drop self-references, edges
    /// touching excluded tables, and duplicates.
    pub fn build(
        side: Side,
        tables: Vec<String>,
        discovered: Vec<ForeignKeyEdge>,
        manual: &[ForeignKeyEdge],
        excluded: &BTreeSet<String>,
    ) -> Self {
        let edges: BTreeSet<ForeignKeyEdge> = discovered
            .into_iter()
            .chain(manual.iter().cloned())
            .filter(|edge| !edge.is_self_reference() && !edge.touches_any(excluded))
            .collect();

        let tables = tables
            .into_iter()
            .filter(|t| !excluded.contains(t))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            side,
            tables,
            edges: edges.into_iter().collect(),
        }
    }

    /// Introspect `schema` through `source` and build the catalog.
    pub async fn fetch<S: ConstraintSource>(
        source: &S,
        side: Side,
        schema: &str,
        manual: &[ForeignKeyEdge],
        excluded: &BTreeSet<String>,
    ) -> Result<Self> {
        let tables = source.fetch_tables(schema).await?;
        let discovered = source.fetch_foreign_keys(schema).await?;
        let catalog = Self::build(side, tables, discovered, manual, excluded);
        tracing::info!(
            "Read {} foreign keys across {} tables from the {} database",
            catalog.edges.len(),
            catalog.tables.len(),
            side
        );
        Ok(catalog)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Edges after merging and filtering, sorted.
    pub fn edges(&self) -> &[ForeignKeyEdge] {
        &self.edges
    }

    /// Every non-excluded table in the schema, sorted.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }
}
