use std::path::Path;
use std::process;

use anyhow::{Context, Result};

use subsetkit_core::catalog::postgres::PgConstraintSource;
use subsetkit_core::catalog::{ConstraintSource, Side};
use subsetkit_core::diff::diff_schemas;
use subsetkit_core::JobSpec;

use crate::args::{DiffArgs, ReportFormat};
use crate::commands::{connect, load_config, resolve_url};

/// Compare source and target schemas.
///
/// Exit codes:
///   0: schemas match
///   1: schemas differ (or error)
pub async fn run(args: &DiffArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let job = JobSpec::from_config(&config)?;

    let source_url = resolve_url(
        args.connection.source.as_deref(),
        config.source.url.as_deref(),
        Side::Source,
    )?;
    let target_url = resolve_url(
        args.connection.target.as_deref(),
        config.target.url.as_deref(),
        Side::Target,
    )?;

    let source = PgConstraintSource::new(connect(&source_url, Side::Source).await?);
    let target = PgConstraintSource::new(connect(&target_url, Side::Target).await?);

    let diff = diff_schemas(
        &source.fetch_columns(&job.source_schema).await?,
        &target.fetch_columns(&job.target_schema).await?,
        &source.fetch_foreign_keys(&job.source_schema).await?,
        &target.fetch_foreign_keys(&job.target_schema).await?,
    );

    match args.format {
        ReportFormat::Json => {
            let json =
                serde_json::to_string_pretty(&diff).context("Failed to serialize schema diff")?;
            println!("{}", json);
        }
        ReportFormat::Text => println!("{}", diff.summary()),
    }

    if !diff.is_empty() {
        process::exit(1);
    }

    Ok(())
}
