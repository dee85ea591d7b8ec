//! # Job Description
//!
//! The validated, typed form of `subsetkit.toml`. Samples and conditions are
//! indexed by table once, at construction, so lookups during the copy never
//! scan the configured lists.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{ForeignKeyEdge, Side};
use crate::config::SubsetConfig;
use crate::error::Result;

/// Working schema used when the config doesn't name one.
pub const DEFAULT_WORKING_SCHEMA: &str = "subset_work";

/// Primary key column used when neither the job nor the table names one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Reduce `table` to at most `target_size` randomly chosen rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSpec {
    pub table: String,
    pub target_size: u64,
}

/// Non-sample filtering for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionSpec {
    pub table: String,
    /// Keep only the most recent N rows by primary key.
    pub row_window: Option<u64>,
    /// Raw boolean SQL expression, composed verbatim.
    pub predicate: Option<String>,
}

impl ConditionSpec {
    /// A spec with neither a window nor a predicate adds no constraint.
    pub fn is_empty(&self) -> bool {
        self.row_window.is_none() && self.predicate.is_none()
    }
}

/// Column name to replacement SQL expression, applied in every table that
/// has a column of that name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnonymizeSpec {
    columns: BTreeMap<String, String>,
}

impl AnonymizeSpec {
    pub fn new(columns: BTreeMap<String, String>) -> Self {
        Self { columns }
    }

    pub fn expression_for(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// (column, expression) pairs in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(c, e)| (c.as_str(), e.as_str()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Everything a copy job needs to know, minus the connection URLs.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub source_schema: String,
    pub target_schema: String,
    pub working_schema: String,
    /// Drop the working schema before and after the run.
    pub drop_schema: bool,
    pub excluded: BTreeSet<String>,
    pub foreign_keys_from: Side,
    pub manual_edges: Vec<ForeignKeyEdge>,
    pub anonymize: AnonymizeSpec,
    pub seed: Option<u64>,
    pub copy_isolated_tables: bool,
    pub pre_copy_sql: Option<String>,
    samples: BTreeMap<String, SampleSpec>,
    conditions: BTreeMap<String, ConditionSpec>,
    default_primary_key: String,
    primary_keys: BTreeMap<String, String>,
}

impl JobSpec {
    /// Validate `config` and index its entries by table.
    pub fn from_config(config: &SubsetConfig) -> Result<Self> {
        config.validate()?;
        config.stale_entries();

        let samples = config
            .samples
            .iter()
            .map(|s| {
                (
                    s.table.clone(),
                    SampleSpec {
                        table: s.table.clone(),
                        target_size: s.size,
                    },
                )
            })
            .collect();

        let conditions = config
            .conditions
            .iter()
            .map(|c| {
                (
                    c.table.clone(),
                    ConditionSpec {
                        table: c.table.clone(),
                        row_window: c.last,
                        predicate: c.condition.clone(),
                    },
                )
            })
            .collect();

        let manual_edges = config
            .links
            .iter()
            .map(|l| {
                ForeignKeyEdge::new(
                    l.table.clone(),
                    l.column.clone(),
                    l.parent_table.clone(),
                    l.parent_column.clone(),
                )
            })
            .collect();

        Ok(Self {
            source_schema: config
                .source
                .schema
                .clone()
                .unwrap_or_else(|| "public".to_string()),
            target_schema: config
                .target
                .schema
                .clone()
                .unwrap_or_else(|| "public".to_string()),
            working_schema: config
                .job
                .working_schema
                .clone()
                .unwrap_or_else(|| DEFAULT_WORKING_SCHEMA.to_string()),
            drop_schema: config.job.drop_schema,
            excluded: config.job.exclude.iter().cloned().collect(),
            foreign_keys_from: config.job.foreign_keys_from,
            manual_edges,
            anonymize: AnonymizeSpec::new(config.anonymize.clone()),
            seed: config.job.seed,
            copy_isolated_tables: config.job.copy_isolated_tables,
            pre_copy_sql: config
                .job
                .pre_copy_sql
                .clone()
                .filter(|sql| !sql.trim().is_empty()),
            samples,
            conditions,
            default_primary_key: config
                .job
                .primary_key
                .clone()
                .unwrap_or_else(|| DEFAULT_PRIMARY_KEY.to_string()),
            primary_keys: config.primary_keys.clone(),
        })
    }

    pub fn sample_for(&self, table: &str) -> Option<&SampleSpec> {
        self.samples.get(table)
    }

    /// Sample specs in table-name order.
    pub fn samples(&self) -> impl Iterator<Item = &SampleSpec> {
        self.samples.values()
    }

    pub fn condition_for(&self, table: &str) -> Option<&ConditionSpec> {
        self.conditions.get(table)
    }

    pub fn primary_key_for(&self, table: &str) -> &str {
        self.primary_keys
            .get(table)
            .map(String::as_str)
            .unwrap_or(&self.default_primary_key)
    }

    /// Name of the keyset table for a sampled table, inside the working schema.
    pub fn keyset_table(&self, table: &str) -> String {
        format!("sample_{}", table)
    }
}
