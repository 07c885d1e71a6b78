use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

mod csv_source;
mod export;
mod logger;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use csv_source::CsvTableSource;
use e2e_topology::{Builder, TopologyConfig, TopologyResolver};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
enum Format {
    /// Rendered rows as a JSON array
    #[default]
    Json,
    /// Rendered rows with a header line
    Csv,
    /// Graphviz digraph of the hop chain
    Dot,
}

#[derive(Parser)]
#[command(name = "e2e-topo")]
#[command(about = "Resolve the end-to-end hop chain of a stream from exported device tables")]
struct Cli {
    /// Directory with one subdirectory of `<table id>.csv` files per element
    #[arg(long)]
    tables: PathBuf,

    /// Element to query
    #[arg(long)]
    element: String,

    /// Starting edge
    #[arg(long)]
    edge: String,

    /// Stream name
    #[arg(long)]
    stream: String,

    /// JSON resolver config (column layout, TTL, depth bound)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    format: Format,

    /// Write to a file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Build snapshots for every exported element before querying
    #[arg(long)]
    refresh: bool,

    /// Output structured JSON logs
    #[arg(long)]
    json_logs: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logger(cli.json_logs, cli.debug);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => TopologyConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TopologyConfig::default(),
    };
    let resolver = TopologyResolver::builder(Arc::new(CsvTableSource::new(&cli.tables)))
        .with_config(config)
        .build()?;

    tracing::debug!(
        "Resolver ready: max_depth={}, cache_ttl={}s",
        resolver.config().max_depth,
        resolver.config().cache_ttl_secs
    );

    if cli.refresh {
        let installed = resolver.refresh_fleet();
        tracing::info!("Built {} snapshots from {}", installed, cli.tables.display());
    }

    // Surface the failure here; the library entry point would swallow it.
    let hops = resolver
        .try_resolve_hops(&cli.element, &cli.edge, &cli.stream)
        .with_context(|| format!("No topology for element '{}'", cli.element))?;
    let hops = e2e_topology::resolver::sorted(&hops);
    tracing::info!(
        element = cli.element,
        edge = cli.edge,
        stream = cli.stream,
        hops = hops.len(),
        "Resolved hop chain"
    );

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    match cli.format {
        Format::Json => export::write_json(&hops, &mut out)?,
        Format::Csv => export::write_csv(&hops, &mut out)?,
        Format::Dot => export::write_dot(&hops, &mut out)?,
    }
    out.flush()?;
    Ok(())
}
