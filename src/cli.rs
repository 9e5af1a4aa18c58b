//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::CliOverrides;

#[derive(Debug, Parser)]
#[command(name = "lucid-log", version, about = "Render structured logs for humans")]
pub struct Cli {
    /// Increase diagnostic output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render structured log lines from a file or standard input
    Show {
        /// File to read; standard input when omitted
        log_file: Option<PathBuf>,
    },
    /// Tail a CloudWatch log group
    Aws(AwsArgs),
}

#[derive(Debug, Args)]
pub struct AwsArgs {
    /// Log group name
    pub log_group_name: Option<String>,

    /// Stream name pattern, anchored at the start; ALL for every stream
    pub log_stream_pattern: Option<String>,

    /// AWS region
    #[arg(short, long)]
    pub region: Option<String>,

    /// Config file supplying defaults for any option
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep polling for new events until interrupted
    #[arg(short, long)]
    pub watch: bool,

    /// Start of the window: 1h, "2 days ago", 2024-01-31 12:00, RFC 3339
    #[arg(short, long)]
    pub start: Option<String>,

    /// End of the window, same syntax as --start, or "now"
    #[arg(short, long)]
    pub end: Option<String>,

    /// CloudWatch filter pattern
    #[arg(short, long)]
    pub filter: Option<String>,
}

impl AwsArgs {
    pub fn overrides(&self, no_color: bool) -> CliOverrides {
        CliOverrides {
            log_group: self.log_group_name.clone(),
            log_stream_pattern: self.log_stream_pattern.clone(),
            region: self.region.clone(),
            filter_pattern: self.filter.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            watch: self.watch,
            no_color,
        }
    }
}
