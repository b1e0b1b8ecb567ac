//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::feed::Grammar;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Election result feed ingestion
#[derive(Parser)]
#[command(
    name = "election-feed",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch election-result XML feeds and publish the latest results",
    long_about = "Watch a mirrored directory of election-result XML files, keep the newest \
                  version of each feed, normalise results to JSON and publish everything to \
                  an object store.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to a custom election-feed.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch, sync and publish until interrupted
    #[command(
        about = "Watch the results directory and publish changes",
        after_help = "Examples:\n  election-feed run\n  election-feed run --dir ./mirror --no-sync\n  FTP_SERVER=ftp.example.com election-feed run --debounce-ms 2000"
    )]
    Run {
        /// Results directory to watch (overrides feed.results_dir)
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,

        /// Do not start the remote mirror job
        #[arg(long)]
        no_sync: bool,

        /// Do not start the live notification endpoint
        #[arg(long)]
        no_live: bool,

        /// Quiet period before a changed file is read (overrides watch.debounce_ms)
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
    },

    /// Parse one feed file and print the record as JSON
    #[command(about = "Parse a result file and print it as JSON")]
    Parse {
        /// XML result file
        file: PathBuf,

        /// Grammar to use (overrides feed.kind)
        #[arg(long, value_name = "local|referendum")]
        kind: Option<Grammar>,
    },

    /// Write a default configuration file
    #[command(about = "Create election-feed.toml with default settings")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings with secrets masked")]
    Config,
}
