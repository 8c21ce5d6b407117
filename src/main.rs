use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sitecar::block::HashAlgorithm;
use sitecar::chunker::ChunkingStrategy;
use sitecar::config::{DEFAULT_CONCURRENCY, DEFAULT_ENTRY_POINT, DEFAULT_MAX_CHILDREN};
use sitecar::Config;
use tracing_subscriber::EnvFilter;

/// Pack a static website directory into a content-addressed CAR archive.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Directory holding the website bundle
    source: PathBuf,

    /// Archive path ending in `.car`, or a directory to write `<root-cid>.car` into
    destination: PathBuf,

    /// `size-<n>`, `cdc`, `cdc-<min>-<avg>-<max>` or `none`
    #[arg(long, default_value_t = ChunkingStrategy::default())]
    chunker: ChunkingStrategy,

    /// `sha2-256` or `blake3`
    #[arg(long, default_value_t = HashAlgorithm::default())]
    hash: HashAlgorithm,

    /// Maximum links per file node
    #[arg(long, default_value_t = DEFAULT_MAX_CHILDREN)]
    max_children: usize,

    /// File name that must be present in the bundle
    #[arg(long, default_value = DEFAULT_ENTRY_POINT)]
    entry_point: String,

    /// Maximum number of files read and hashed at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

impl Cli {
    fn config(&self) -> Config {
        Config::default()
            .with_chunking(self.chunker)
            .with_hash(self.hash)
            .with_max_children(self.max_children)
            .with_entry_point(&self.entry_point)
            .with_concurrency(self.concurrency)
    }
}

fn setup_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();
    let generated = sitecar::generate(&cli.source, &cli.destination, &config).await?;

    if let Some(file_name) = generated.file_name {
        println!("{file_name}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logger();
    // usage errors exit with 1 like every other failure
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
