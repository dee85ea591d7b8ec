use std::path::Path;

use anyhow::{Context, Result};

use subsetkit_core::catalog::Side;
use subsetkit_core::copy::resolve_order;
use subsetkit_core::graph::dag::DependencyGraph;
use subsetkit_core::graph::topo::CopyOrder;
use subsetkit_core::JobSpec;

use crate::args::{PlanArgs, ReportFormat};
use crate::commands::{connect, load_catalog, load_config, resolve_url};

/// Print the copy order. Reads catalogs only.
pub async fn run(args: &PlanArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let job = JobSpec::from_config(&config)?;

    let source_url = resolve_url(
        args.connection.source.as_deref(),
        config.source.url.as_deref(),
        Side::Source,
    )?;
    let source = connect(&source_url, Side::Source).await?;

    let target = if job.foreign_keys_from == Side::Target {
        let target_url = resolve_url(
            args.connection.target.as_deref(),
            config.target.url.as_deref(),
            Side::Target,
        )?;
        Some(connect(&target_url, Side::Target).await?)
    } else {
        None
    };

    let catalog = load_catalog(&job, &source, target.as_ref()).await?;
    let graph = DependencyGraph::from_catalog(&catalog);
    let order = resolve_order(&job, &catalog, &graph)?;

    match args.format {
        ReportFormat::Json => {
            let json =
                serde_json::to_string_pretty(&order).context("Failed to serialize copy order")?;
            println!("{}", json);
        }
        ReportFormat::Text => print!("{}", describe_order(&order, &job)),
    }

    Ok(())
}

/// Copy order grouped by round, each table annotated with its filters.
pub fn describe_order(order: &CopyOrder, job: &JobSpec) -> String {
    let mut out = format!(
        "Copy order ({} tables, working schema {}):\n",
        order.len(),
        job.working_schema
    );
    let mut position = 0;

    for (round, tables) in order.rounds.iter().enumerate() {
        out.push_str(&format!("  round {}\n", round + 1));
        for table in tables {
            position += 1;
            let mut notes = Vec::new();
            if let Some(sample) = job.sample_for(table) {
                notes.push(format!("sample {}", sample.target_size));
            }
            if let Some(condition) = job.condition_for(table) {
                if let Some(window) = condition.row_window {
                    notes.push(format!("last {}", window));
                }
                if let Some(predicate) = &condition.predicate {
                    notes.push(format!("where {}", predicate));
                }
            }
            if notes.is_empty() {
                out.push_str(&format!("    {:>3}. {}\n", position, table));
            } else {
                out.push_str(&format!(
                    "    {:>3}. {} ({})\n",
                    position,
                    table,
                    notes.join("; ")
                ));
            }
        }
    }

    out
}
