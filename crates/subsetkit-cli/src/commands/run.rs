use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::Table as ComfyTable;

use subsetkit_core::catalog::Side;
use subsetkit_core::copy::postgres::PgWorkingSchema;
use subsetkit_core::copy::report::{CopyReport, TransferReport};
use subsetkit_core::copy::transfer::PgCopyTransfer;
use subsetkit_core::copy::{CopyJob, JobState};
use subsetkit_core::sample::postgres::PgKeySource;
use subsetkit_core::JobSpec;

use crate::args::{ReportFormat, RunArgs};
use crate::commands::plan::describe_order;
use crate::commands::{connect, load_catalog, load_config, resolve_url, spinner};

pub async fn run(args: &RunArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut job = JobSpec::from_config(&config)?;
    if args.seed.is_some() {
        job.seed = args.seed;
    }

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

    // Phase 1: Catalog
    let pb = spinner("1/2", "Reading foreign keys...")?;
    let source = connect(&source_url, Side::Source).await?;
    let target = connect(&target_url, Side::Target).await?;
    let catalog = load_catalog(&job, &source, Some(&target)).await?;
    pb.finish_with_message(format!(
        "Reading foreign keys... ✓ {} tables, {} foreign keys ({})",
        catalog.tables().len(),
        catalog.edges().len(),
        catalog.side()
    ));

    let store = PgWorkingSchema::new(source.clone(), &job.working_schema);
    let keys = PgKeySource::new(source.clone(), &job.source_schema, &job.working_schema);
    let transfer = PgCopyTransfer::new(source, target, &job.working_schema, &job.target_schema);

    // The order is printed before anything is written.
    let mut copy = CopyJob::new(&job, &catalog, &store, &keys, &transfer);
    let order = copy.plan()?;
    if let ReportFormat::Text = args.format {
        print!("{}", describe_order(&order, &job));
    }

    // Phase 2: Copy
    let pb2 = spinner("2/2", "Starting...")?;
    let observer = |state: JobState, table: Option<&str>| match table {
        Some(table) => pb2.set_message(format!("{}: {}", state, table)),
        None => pb2.set_message(format!("{}...", state)),
    };
    let mut copy = copy.with_observer(&observer);

    if args.transfer_only {
        let transfers = copy.transfer_only().await?;
        pb2.finish_with_message(format!(
            "Transferred {} tables... ✓",
            transfers.len()
        ));
        match args.format {
            ReportFormat::Json => {
                let json = serde_json::to_string_pretty(&transfers)
                    .context("Failed to serialize transfer report")?;
                println!("{}", json);
            }
            ReportFormat::Text => println!("{}", transfer_table(&transfers)),
        }
        return Ok(());
    }

    let report = copy.run().await?;
    pb2.finish_with_message(format!(
        "Copied {} rows, transferred {} rows... ✓",
        report.total_inserted(),
        report.total_transferred()
    ));

    match args.format {
        ReportFormat::Json => {
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize copy report")?;
            println!("{}", json);
        }
        ReportFormat::Text => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &CopyReport) {
    if !report.samples.is_empty() {
        let mut t = ComfyTable::new();
        t.set_header(vec!["Sampled table", "Rows", "Requested", "Density"]);
        for sample in &report.samples {
            t.add_row(vec![
                sample.table.clone(),
                sample.size.to_string(),
                sample.target_size.to_string(),
                format!("{:.4}", sample.density),
            ]);
        }
        println!("{}", t);
    }

    let mut t = ComfyTable::new();
    t.set_header(vec!["Table", "Truncated", "Inserted", "Transferred"]);
    for table in &report.tables {
        let transferred = report
            .transfers
            .iter()
            .find(|t| t.table == table.table)
            .map(|t| t.rows.to_string())
            .unwrap_or_else(|| "-".to_string());
        t.add_row(vec![
            table.table.clone(),
            table.truncated.to_string(),
            table.inserted.to_string(),
            transferred,
        ]);
    }
    println!("{}", t);

    if !report.anonymized.is_empty() {
        let mut t = ComfyTable::new();
        t.set_header(vec!["Anonymized column", "Rows"]);
        for column in &report.anonymized {
            t.add_row(vec![
                format!("{}.{}", column.table, column.column),
                column.rows.to_string(),
            ]);
        }
        println!("{}", t);
    }
}

fn transfer_table(transfers: &[TransferReport]) -> ComfyTable {
    let mut t = ComfyTable::new();
    t.set_header(vec!["Table", "Transferred"]);
    for transfer in transfers {
        t.add_row(vec![transfer.table.clone(), transfer.rows.to_string()]);
    }
    t
}
