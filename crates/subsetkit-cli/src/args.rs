use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "subsetkit",
    about = "Copy a sampled, anonymized, referentially consistent subset of a PostgreSQL database",
    version,
    after_help = "Examples:\n  subsetkit plan                          # show the copy order from subsetkit.toml\n  subsetkit run --source postgres://localhost/prod --target postgres://localhost/staging\n  subsetkit run --transfer-only           # reload the target from the working schema\n  subsetkit graph --format mermaid\n  subsetkit diff --format json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the job file (default: ./subsetkit.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the subset in the working schema and load it into the target
    Run(RunArgs),

    /// Show the copy order without touching either database's data
    Plan(PlanArgs),

    /// Visualize the table dependency graph
    Graph(GraphArgs),

    /// Compare source and target columns and foreign keys
    Diff(DiffArgs),
}

#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Source database URL. Falls back to SOURCE_DATABASE_URL, .env, then
    /// the [source] section of the job file
    #[arg(long, env = "SOURCE_DATABASE_URL")]
    pub source: Option<String>,

    /// Target database URL. Falls back to TARGET_DATABASE_URL, .env, then
    /// the [target] section of the job file
    #[arg(long, env = "TARGET_DATABASE_URL")]
    pub target: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Skip sampling and copying; transfer the existing working schema
    #[arg(long)]
    pub transfer_only: bool,

    /// Random seed for reproducible samples (overrides the job file)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format
    #[arg(long, default_value = "mermaid")]
    pub format: GraphFormat,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}
