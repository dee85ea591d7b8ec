pub mod diff;
pub mod graph;
pub mod plan;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sqlx::postgres::{PgPool, PgPoolOptions};

use subsetkit_core::catalog::postgres::PgConstraintSource;
use subsetkit_core::catalog::{Catalog, Side};
use subsetkit_core::config::{self, SubsetConfig};
use subsetkit_core::error::SubsetError;
use subsetkit_core::sql::sanitize_url;
use subsetkit_core::JobSpec;

/// Load the job file from `path`, or `./subsetkit.toml` when no path is
/// given. A missing default file means an empty job.
pub fn load_config(path: Option<&Path>) -> Result<SubsetConfig> {
    match path {
        Some(path) => Ok(config::read_config_file(path)?),
        None => Ok(config::read_config(Path::new("."))?.unwrap_or_default()),
    }
}

/// Resolve a database URL. Flag and environment variable are already merged
/// by clap; the job file is the last resort.
pub fn resolve_url(explicit: Option<&str>, configured: Option<&str>, side: Side) -> Result<String> {
    if let Some(url) = explicit.or(configured) {
        return Ok(url.to_string());
    }

    let env_var = match side {
        Side::Source => "SOURCE_DATABASE_URL",
        Side::Target => "TARGET_DATABASE_URL",
    };
    Err(SubsetError::NoDatabaseUrl {
        side: side.to_string(),
        env_var: env_var.to_string(),
    }
    .into())
}

pub async fn connect(url: &str, side: Side) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await
        .map_err(|e| SubsetError::Connection {
            message: format!("Failed to connect to the {} database", side),
            connection_hint: sanitize_url(url),
            source: e,
        })?;
    Ok(pool)
}

/// Read the authoritative foreign keys. `target` is only needed when the
/// job takes its foreign keys from the target.
pub async fn load_catalog(job: &JobSpec, source: &PgPool, target: Option<&PgPool>) -> Result<Catalog> {
    let (pool, schema) = match job.foreign_keys_from {
        Side::Source => (source, &job.source_schema),
        Side::Target => (
            target.context("Foreign keys come from the target, but it isn't connected")?,
            &job.target_schema,
        ),
    };

    let introspector = PgConstraintSource::new(pool.clone());
    let catalog = Catalog::fetch(
        &introspector,
        job.foreign_keys_from,
        schema,
        &job.manual_edges,
        &job.excluded,
    )
    .await?;
    Ok(catalog)
}

pub fn spinner(prefix: &str, message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{prefix}] {msg}")
            .context("Invalid progress template")?,
    );
    pb.set_prefix(prefix.to_string());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}
