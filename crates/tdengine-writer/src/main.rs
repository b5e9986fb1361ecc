// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TDengine writer CLI
//!
//! Writes JSON-lines records into TDengine.
//!
//! # Usage
//!
//! ```bash
//! # Write records from a file through taosAdapter
//! tdengine-writer --config job.toml --input records.jsonl
//!
//! # Read records from stdin and keep rejected rows
//! cat records.jsonl | tdengine-writer --config job.toml --dirty dirty.jsonl
//!
//! # Print the statements instead of sending them
//! tdengine-writer --config job.toml --input records.jsonl --dry-run
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tdengine_writer::record::LoggingCollector;
use tdengine_writer::source::{DirtyFileWriter, JsonLinesSource};
use tdengine_writer::{
    Connector, DataHandler, DirtyRecordCollector, MemoryConnector, RecordSource, RestConnector,
    WriteSummary, WriterConfig,
};

#[derive(Parser, Debug)]
#[command(name = "tdengine-writer")]
#[command(about = "Batched writer for TDengine super, sub and normal tables", long_about = None)]
struct Args {
    /// Job configuration (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// JSON-lines record file (default: stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Append rejected records to this JSON-lines file
    #[arg(short, long)]
    dirty: Option<PathBuf>,

    /// HTTP request timeout in seconds (0 = none)
    #[arg(long, default_value_t = 0)]
    timeout: u64,

    /// Build statements without sending them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = WriterConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let loader = config
        .schema_loader()
        .context("destination metadata must be declared in [schema]")?;

    tracing::info!("TDengine writer starting...");
    tracing::info!("  URL: {}", config.jdbc_url);
    tracing::info!("  Tables: {:?}", config.table);
    tracing::info!("  Columns: {:?}", config.column);
    tracing::info!("  Batch size: {}", config.batch_size);

    let mut source: Box<dyn RecordSource> = match &args.input {
        Some(path) => Box::new(
            JsonLinesSource::open(path)
                .with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(JsonLinesSource::new(std::io::stdin().lock())),
    };
    let mut collector: Box<dyn DirtyRecordCollector> = match &args.dirty {
        Some(path) => Box::new(
            DirtyFileWriter::create(path)
                .with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(LoggingCollector),
    };

    let summary = if args.dry_run {
        tracing::info!("Dry run, statements are printed instead of sent");
        let connector = MemoryConnector::new();
        let log = connector.log();
        let summary = run(config, connector, loader, source.as_mut(), collector.as_mut())?;
        let log = log.borrow();
        for sql in &log.statements {
            println!("{}", sql);
        }
        for line in log.lines() {
            println!("{}", line);
        }
        summary
    } else {
        let mut connector = RestConnector::new();
        if args.timeout > 0 {
            connector = connector.with_timeout(Duration::from_secs(args.timeout));
        }
        run(config, connector, loader, source.as_mut(), collector.as_mut())?
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run<C: Connector>(
    config: WriterConfig,
    connector: C,
    loader: tdengine_writer::StaticSchemaLoader,
    source: &mut dyn RecordSource,
    collector: &mut dyn DirtyRecordCollector,
) -> Result<WriteSummary> {
    let mut handler = DataHandler::new(config, connector, loader);
    handler.handle(source, collector).context("write failed")
}
