//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod crawl;
mod fallback;
mod stats;
mod topics;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use review_harvester::config::Config;

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Systematic review metadata harvester")]
#[command(version)]
pub struct Cli {
    /// Config file path (TOML, or JSON by extension)
    #[arg(short, long, global = true, env = "HARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Check if quiet mode is enabled (for early logging setup).
pub fn is_quiet() -> bool {
    std::env::args().any(|arg| arg == "-q" || arg == "--quiet")
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a topic's listing and write one record per review
    Crawl(crawl::CrawlArgs),

    /// Skip the listing and build records from the bibliographic API only
    Fallback {
        /// Topic name
        topic: String,
        /// Output file (default from config)
        #[arg(short, long)]
        output: Option<String>,
        /// Append instead of truncating
        #[arg(short, long)]
        append: bool,
        /// Maximum records to write
        #[arg(long)]
        cap: Option<usize>,
        /// Keep works that do not mention the topic
        #[arg(long)]
        no_filter: bool,
    },

    /// List the builtin topics and their facet ids
    Topics {
        /// Only show topics whose name contains this text
        filter: Option<String>,
    },

    /// Summarize an output file
    Stats {
        /// Output file to read (default from config)
        file: Option<PathBuf>,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Crawl(args) => crawl::cmd_crawl(config, args).await,
        Commands::Fallback {
            topic,
            output,
            append,
            cap,
            no_filter,
        } => fallback::cmd_fallback(config, &topic, output, append, cap, no_filter).await,
        Commands::Topics { filter } => topics::cmd_topics(filter.as_deref()),
        Commands::Stats { file } => stats::cmd_stats(&config, file),
    }
}
