use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use tfscope_logs::{
    BatchStats, EntryStore, LogFileInfo, LogLevel, LogPipeline, SearchFilterSpec, Section,
    compile_filter, parse_section_arg, parse_timestamp_arg,
};

mod config;
mod ingest;

use config::Config;

/// tfscope - normalize, correlate and search Terraform provisioning logs
#[derive(Parser, Debug)]
#[command(name = "tfscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ~/.config/tfscope/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log pipeline activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize and enrich log files, printing every entry and parse error
    Parse {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Search entries of the given log files
    Search {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Summarize log files
    Stats {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Show one request/response chain in timestamp order
    Chain {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Correlation id of the chain
        #[arg(long)]
        req_id: String,
    },
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// Only entries from this log file id
    #[arg(long)]
    file_id: Option<String>,

    /// Case-insensitive text in the message or raw line
    #[arg(short, long)]
    text: Option<String>,

    #[arg(long)]
    resource_type: Option<String>,

    /// Level label, e.g. ERROR
    #[arg(short, long)]
    level: Option<String>,

    /// plan, apply or other
    #[arg(long, value_parser = parse_section_arg)]
    section: Option<Section>,

    #[arg(long)]
    req_id: Option<String>,

    /// Inclusive lower bound
    #[arg(long, value_parser = parse_timestamp_arg)]
    from: Option<DateTime<Utc>>,

    /// Inclusive upper bound
    #[arg(long, value_parser = parse_timestamp_arg)]
    to: Option<DateTime<Utc>>,

    #[arg(long, default_value = "0")]
    page: usize,

    /// Page size (defaults to search.page_size)
    #[arg(long)]
    size: Option<usize>,
}

impl FilterArgs {
    fn into_spec(self, default_size: usize) -> SearchFilterSpec {
        SearchFilterSpec {
            log_file_id: self.file_id,
            free_text: self.text,
            resource_type: self.resource_type,
            level: self.level.as_deref().map(LogLevel::from_label),
            section: self.section,
            correlation_id: self.req_id,
            timestamp_from: self.from,
            timestamp_to: self.to,
            only_unread: None,
            page: Some(self.page),
            size: Some(self.size.unwrap_or(default_size)),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileStats {
    log_file_id: String,
    #[serde(flatten)]
    stats: BatchStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport {
    files: Vec<FileStats>,
    log_files: Vec<LogFileInfo>,
    resource_types: Vec<String>,
    correlation_ids: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let pretty = args.pretty || config.output.pretty;
    let pipeline = LogPipeline::new(config.parser.clone());

    match args.command {
        Command::Parse { files } => {
            let processed = ingest::process_files(&pipeline, &files).await?;
            emit(&processed, pretty)
        }
        Command::Search { files, filter } => {
            let store = ingest::load_store(&pipeline, &files).await?;
            let query = compile_filter(&filter.into_spec(config.search.page_size));
            tracing::debug!(?query, "compiled search");
            emit(&store.search(&query), pretty)
        }
        Command::Stats { files } => {
            let processed = ingest::process_files(&pipeline, &files).await?;
            let store = EntryStore::new();
            let mut per_file = Vec::with_capacity(processed.len());
            for file in processed {
                store.insert_batch(file.outcome.entries);
                per_file.push(FileStats {
                    log_file_id: file.log_file_id,
                    stats: file.stats,
                });
            }
            emit(
                &StatsReport {
                    files: per_file,
                    log_files: store.log_files(),
                    resource_types: store.distinct_resource_types(),
                    correlation_ids: store.distinct_correlation_ids(),
                },
                pretty,
            )
        }
        Command::Chain { files, req_id } => {
            let store = ingest::load_store(&pipeline, &files).await?;
            let chain = store.request_chain(&req_id);
            if chain.is_empty() {
                tracing::warn!(req_id, "no entries with this correlation id");
            }
            emit(&chain, pretty)
        }
    }
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}
