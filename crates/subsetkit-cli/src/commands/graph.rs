use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;

use subsetkit_core::catalog::Side;
use subsetkit_core::graph::cycle::find_cycles;
use subsetkit_core::graph::dag::DependencyGraph;
use subsetkit_core::graph::visualize::{self, GraphFormat as VizFormat};
use subsetkit_core::JobSpec;

use crate::args::GraphArgs;
use crate::commands::{connect, load_catalog, load_config, resolve_url};

pub async fn run(args: &GraphArgs, config_path: Option<&Path>) -> Result<()> {
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

    let all: BTreeSet<String> = graph.table_names().into_iter().map(String::from).collect();
    let cycles = find_cycles(&graph, &all);
    for cycle in &cycles {
        eprintln!("warning: cycle between {}", cycle.join(", "));
    }
    let highlighted: BTreeSet<String> = cycles.into_iter().flatten().collect();

    let format = match args.format {
        crate::args::GraphFormat::Mermaid => VizFormat::Mermaid,
        crate::args::GraphFormat::Dot => VizFormat::Dot,
    };

    let output = visualize::visualize(&graph, &highlighted, format);
    println!("{}", output);

    Ok(())
}
