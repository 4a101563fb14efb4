use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

mod commands;
mod envelope;
mod flags;
mod logging;

use commands::Session;
use envelope::ErrorEnvelope;
use flags::{ExportFormat, LogFormat};

#[derive(Parser)]
#[command(name = "auditgraph")]
#[command(about = "Deterministic knowledge graph for notes and repositories", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Configuration file (JSON, YAML or TOML); defaults to <root>/config/auditgraph.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured active profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool and artifact schema versions
    Version,

    /// Write the default config and include directories
    Init,

    /// Scan the configured include paths and record every source
    Ingest,

    /// Ingest explicit files or directories inside the workspace
    Import(ImportArgs),

    /// Resolve the run produced by ingest
    Normalize(RunArgs),

    /// Extract entities and claims from ingested sources
    Extract(RunArgs),

    /// Link entities that share a source
    Link(RunArgs),

    /// Build the search indexes
    Index(RunArgs),

    /// Run every stage in order
    Rebuild,

    /// Keyword search over the bm25 index
    Query(QueryArgs),

    /// Show one entity
    Node(NodeArgs),

    /// Breadth-first neighborhood of an entity
    Neighbors(NeighborsArgs),

    /// Direct edge between two entities, if any
    #[command(name = "why-connected")]
    WhyConnected(WhyConnectedArgs),

    /// Compare the ingest records of two runs
    Diff(DiffArgs),

    /// Export the graph as JSON, DOT or upsert batches
    Export(ExportArgs),

    /// Print JSON Schemas of the artifact types
    Schema,
}

#[derive(Args)]
struct ImportArgs {
    /// Files or directories to import
    #[arg(required = true)]
    targets: Vec<String>,
}

#[derive(Args)]
struct RunArgs {
    /// Run to operate on (defaults to the configured run selection)
    #[arg(long)]
    run_id: Option<String>,
}

#[derive(Args)]
struct QueryArgs {
    /// Search query
    query: String,
}

#[derive(Args)]
struct NodeArgs {
    /// Entity id
    id: String,
}

#[derive(Args)]
struct NeighborsArgs {
    /// Entity id
    id: String,

    /// Traversal depth
    #[arg(long, default_value_t = 1)]
    depth: usize,
}

#[derive(Args)]
struct WhyConnectedArgs {
    from_id: String,
    to_id: String,
}

#[derive(Args)]
struct DiffArgs {
    run_a: String,
    run_b: String,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long, value_enum, default_value = "json")]
    format: ExportFormat,

    /// Output file, inside <root>/exports (defaults to exports/subgraphs/export.<format>)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Records per upsert batch for `--format records`
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(logging::forced_level(cli.verbose, cli.quiet), cli.log_format);

    match run(cli) {
        Ok(output) => print_json(&output),
        Err(err) => {
            log::error!("{err:#}");
            print_json(&ErrorEnvelope::from_error(&err));
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<Value> {
    let session = || Session::open(&cli.root, cli.config.as_deref(), cli.profile.as_deref());
    match cli.command {
        Commands::Version => Ok(commands::version()),
        Commands::Init => commands::init(&cli.root),
        Commands::Schema => commands::schema(),
        Commands::Ingest => session()?.ingest(),
        Commands::Import(args) => session()?.import(&args.targets),
        Commands::Normalize(args) => session()?.stage("normalize", args.run_id.as_deref()),
        Commands::Extract(args) => session()?.stage("extract", args.run_id.as_deref()),
        Commands::Link(args) => session()?.stage("link", args.run_id.as_deref()),
        Commands::Index(args) => session()?.stage("index", args.run_id.as_deref()),
        Commands::Rebuild => session()?.rebuild(),
        Commands::Query(args) => session()?.query(&args.query),
        Commands::Node(args) => session()?.node(&args.id),
        Commands::Neighbors(args) => session()?.neighbors(&args.id, args.depth),
        Commands::WhyConnected(args) => session()?.why_connected(&args.from_id, &args.to_id),
        Commands::Diff(args) => session()?.diff(&args.run_a, &args.run_b),
        Commands::Export(args) => {
            session()?.export(args.format, args.output.as_deref(), args.batch_size)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => {
            eprintln!("Failed to render output: {err}");
            std::process::exit(1);
        }
    }
}
