mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "melo")]
#[command(version, about = "Melo CLI - inspect and maintain Melo log files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log file commands
    Logs {
        /// Log directory (defaults to the configured rotation directory)
        #[arg(short, long, global = true)]
        dir: Option<PathBuf>,

        /// Config file to read the `[logging]` table from
        #[arg(short, long, global = true, default_value = "melo.toml")]
        config: PathBuf,

        #[command(subcommand)]
        command: LogsCommands,
    },

    /// Convert a human-readable size such as "10MB" to bytes
    Size {
        /// Size to parse
        value: String,
    },
}

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Search entries across every log file, newest first
    Query(QueryArgs),

    /// Summarize entries by level, path and error
    Stats,

    /// Rotate active files over the size limit
    Rotate,

    /// Delete the oldest files beyond the retention limit
    Cleanup,
}

#[derive(clap::Args, Default)]
pub struct QueryArgs {
    /// Exact level: debug, info, warn or error
    #[arg(short, long)]
    pub level: Option<String>,

    #[arg(long)]
    pub correlation_id: Option<String>,

    /// Case-insensitive substring of the message
    #[arg(short, long)]
    pub search: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    /// Request path
    #[arg(long)]
    pub path: Option<String>,

    /// Response status code
    #[arg(long)]
    pub status: Option<u16>,

    /// RFC 3339 lower bound, e.g. 2024-05-01T00:00:00Z
    #[arg(long)]
    pub since: Option<String>,

    /// RFC 3339 upper bound
    #[arg(long)]
    pub until: Option<String>,

    #[arg(long, default_value = "0")]
    pub offset: usize,

    #[arg(short = 'n', long, default_value = "50")]
    pub limit: usize,

    /// Print raw JSON lines
    #[arg(long)]
    pub json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Logs { dir, config, command } => {
            commands::logs::execute(dir, &config, command)?;
        }
        Commands::Size { value } => {
            commands::size::execute(&value)?;
        }
    }

    Ok(())
}
