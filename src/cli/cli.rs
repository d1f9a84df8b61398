use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Mirror a directory subtree into memory and report what changes in it.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// The host root the tracked directory is resolved against
    #[clap(long, short, default_value = ".")]
    pub root: PathBuf,

    /// Directory to track, relative to the host root [default: .claude]
    #[clap(long, short)]
    pub tracked: Option<String>,

    /// Milliseconds between polling passes [default: 2000]
    #[clap(long, short = 'i')]
    pub interval_ms: Option<u64>,

    /// Milliseconds to wait before the first pass [default: 100]
    #[clap(long)]
    pub startup_delay_ms: Option<u64>,

    /// Run a single pass, print the tree and exit
    #[clap(long)]
    pub once: bool,
}
