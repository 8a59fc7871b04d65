//! kntable CLI entry point.

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use kntable_arrow::BridgeOptions;
use tracing_subscriber::EnvFilter;

use kntable::cli::{Args, Command, OutputFormatter};
use kntable::inspect::{default_registry, read_arrow_file, read_schema_file};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();

    let registry = default_registry().context("Failed to register logical types")?;
    let formatter = OutputFormatter::new(args.format, &registry);
    let mut stdout = io::stdout().lock();

    match args.command {
        Command::Schema { file } => {
            let schema = read_schema_file(&file, &registry)
                .with_context(|| format!("Failed to read schema: {}", file.display()))?;
            formatter.write_schema(&schema, &mut stdout)?;
        }
        Command::Arrow {
            file,
            sentinel,
            unfinished,
        } => {
            let mut options = BridgeOptions::default();
            if let Some(sentinel) = sentinel {
                options = options.with_sentinel(sentinel);
            }
            let table = read_arrow_file(&file, !unfinished, &registry, &options)
                .with_context(|| format!("Failed to read Arrow file: {}", file.display()))?;
            formatter.write_table(&table, &mut stdout)?;
        }
        Command::Types => formatter.write_types(&mut stdout)?,
    }

    Ok(())
}
