//! # Configuration File Parser
//!
//! Reads and parses `subsetkit.toml`, the job description for a subsetting
//! run. Supports:
//!
//! - `[source]` / `[target]`: connection URL and schema for each side
//! - `[job]`: working schema, exclusions, which side's foreign keys to trust
//! - `[primary_keys]`: per-table primary key column overrides
//! - `[anonymize]`: column name to replacement SQL expression
//! - `[[samples]]`: tables to reduce to roughly `size` rows
//! - `[[conditions]]`: row windows (`last`) and raw predicates (`condition`)
//! - `[[links]]`: foreign keys the database doesn't declare
//!
//! Example `subsetkit.toml`:
//!
//! ```toml
//! [source]
//! url = "postgres://localhost/prod"
//!
//! [target]
//! url = "postgres://localhost/staging"
//!
//! [job]
//! working_schema = "spider_export"
//! exclude = ["api_logs", "mailing_logs"]
//! foreign_keys_from = "target"
//!
//! [anonymize]
//! last_name = "'Jones'"
//! guid = "md5(random()::text)"
//!
//! [[samples]]
//! table = "members"
//! size = 10000
//!
//! [[conditions]]
//! table = "mailings"
//! last = 1000
//! condition = "parent_mailing_id IS NULL"
//!
//! [[links]]
//! table = "orders"
//! column = "member_id"
//! parent_table = "members"
//! parent_column = "id"
//! ```
//!
//! The raw file is validated and converted into a [`JobSpec`](crate::job::JobSpec)
//! before any connection is opened.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::catalog::Side;
use crate::error::{Result, SubsetError};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "subsetkit.toml";

/// Top-level subsetkit.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubsetConfig {
    /// Database the subset is read from. The working schema lives here.
    pub source: DatabaseConfig,
    /// Database the subset is loaded into.
    pub target: DatabaseConfig,
    /// Job-wide settings.
    pub job: JobConfig,
    /// Primary key column per table, when it isn't the job default.
    pub primary_keys: BTreeMap<String, String>,
    /// Column name to replacement SQL expression.
    pub anonymize: BTreeMap<String, String>,
    pub samples: Vec<SampleConfig>,
    pub conditions: Vec<ConditionConfig>,
    /// Manually declared foreign keys, merged with the discovered ones.
    pub links: Vec<LinkConfig>,
}

/// Database connection configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "postgres://localhost/myapp").
    pub url: Option<String>,
    /// Schema holding the application tables (default "public").
    pub schema: Option<String>,
}

/// Job-wide settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Schema on the source database where copies are assembled.
    pub working_schema: Option<String>,
    /// Drop the working schema before the run and again after it.
    pub drop_schema: bool,
    /// Tables never touched by the job.
    pub exclude: Vec<String>,
    /// Which database's declared foreign keys drive the copy order.
    pub foreign_keys_from: Side,
    /// Default primary key column (default "id").
    pub primary_key: Option<String>,
    /// Fixed random seed for reproducible samples.
    pub seed: Option<u64>,
    /// Also copy tables that have no foreign-key relationships.
    pub copy_isolated_tables: bool,
    /// Raw statements run on the source right before the transfer.
    pub pre_copy_sql: Option<String>,
}

/// `[[samples]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleConfig {
    pub table: String,
    /// Upper bound on the number of sampled rows.
    pub size: u64,
}

/// `[[conditions]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionConfig {
    pub table: String,
    /// Keep only the most recent `last` rows by primary key.
    pub last: Option<u64>,
    /// Raw boolean SQL expression.
    pub condition: Option<String>,
}

/// `[[links]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub table: String,
    pub column: String,
    pub parent_table: String,
    pub parent_column: String,
}

/// Read and parse a subsetkit.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed.
pub fn read_config(dir: &Path) -> Result<Option<SubsetConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    read_config_file(&path).map(Some)
}

/// Read and parse a config file at an explicit path.
pub fn read_config_file(path: &Path) -> Result<SubsetConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SubsetError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let config: SubsetConfig = toml::from_str(&content).map_err(|e| SubsetError::Config {
        message: format!("Failed to parse {}: {}", path.display(), e),
    })?;

    config.validate()?;

    Ok(config)
}

impl SubsetConfig {
    /// Validate semantic constraints that serde cannot enforce.
    ///
    /// Runs right after parsing so a broken job file fails before any
    /// database is touched.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for sample in &self.samples {
            if sample.table.is_empty() {
                return Err(config_error("[[samples]] entry has an empty table name"));
            }
            if sample.size == 0 {
                return Err(config_error(format!(
                    "Sample for '{}' has size 0. Use a positive size or exclude the table.",
                    sample.table
                )));
            }
            if !seen.insert(sample.table.as_str()) {
                return Err(config_error(format!(
                    "Table '{}' has more than one [[samples]] entry",
                    sample.table
                )));
            }
            if self.job.exclude.contains(&sample.table) {
                return Err(config_error(format!(
                    "Table '{}' is both sampled and excluded",
                    sample.table
                )));
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for condition in &self.conditions {
            if condition.table.is_empty() {
                return Err(config_error(
                    "[[conditions]] entry has an empty table name",
                ));
            }
            if !seen.insert(condition.table.as_str()) {
                return Err(config_error(format!(
                    "Table '{}' has more than one [[conditions]] entry",
                    condition.table
                )));
            }
            if self.job.exclude.contains(&condition.table) {
                return Err(config_error(format!(
                    "Table '{}' has a condition but is excluded",
                    condition.table
                )));
            }
            if condition
                .condition
                .as_deref()
                .is_some_and(|c| c.trim().is_empty())
            {
                return Err(config_error(format!(
                    "Condition for '{}' is blank. Remove the key instead.",
                    condition.table
                )));
            }
        }

        for link in &self.links {
            let fields = [
                &link.table,
                &link.column,
                &link.parent_table,
                &link.parent_column,
            ];
            if fields.iter().any(|f| f.trim().is_empty()) {
                return Err(config_error(format!(
                    "[[links]] entry {}.{} -> {}.{} has an empty field",
                    link.table, link.column, link.parent_table, link.parent_column
                )));
            }
        }

        for (column, expression) in &self.anonymize {
            if expression.trim().is_empty() {
                return Err(config_error(format!(
                    "[anonymize] expression for column '{}' is empty",
                    column
                )));
            }
        }

        for (table, column) in &self.primary_keys {
            if column.trim().is_empty() {
                return Err(config_error(format!(
                    "[primary_keys] entry for '{}' is empty",
                    table
                )));
            }
        }

        let working = self.job.working_schema.as_deref();
        let source = self.source.schema.as_deref().unwrap_or("public");
        if working == Some(source) {
            return Err(config_error(format!(
                "job.working_schema must differ from the source schema '{}'",
                source
            )));
        }

        Ok(())
    }

    /// Tables listed in `[primary_keys]` or any spec entry that are also
    /// excluded. Not an error, but almost always a stale entry.
    pub fn stale_entries(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for table in self.primary_keys.keys() {
            if self.job.exclude.contains(table) {
                warnings.push(format!(
                    "subsetkit.toml: [primary_keys] entry '{}' refers to an excluded table",
                    table
                ));
            }
        }
        for link in &self.links {
            if self.job.exclude.contains(&link.table)
                || self.job.exclude.contains(&link.parent_table)
            {
                warnings.push(format!(
                    "subsetkit.toml: [[links]] entry {}.{} -> {} touches an excluded table and will be ignored",
                    link.table, link.column, link.parent_table
                ));
            }
        }
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        warnings
    }
}

fn config_error(message: impl Into<String>) -> SubsetError {
    SubsetError::Config {
        message: message.into(),
    }
}
