//! reloadwatch CLI - run a command whenever a config file settles

use anyhow::Result;
use clap::{Parser, Subcommand};
use reload_cli::{cmd, logging, settings};
use std::path::PathBuf;

/// reloadwatch - Debounced reload on config file changes
#[derive(Parser)]
#[command(name = "reloadwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a file and run a command after each burst of changes
    Watch {
        /// File to watch
        path: PathBuf,

        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Quiet period in milliseconds before reloading (default: 100)
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Run the command once before watching
        #[arg(long)]
        initial: bool,

        /// Command to run, after `--`
        #[arg(last = true, required = true, num_args = 1..)]
        command: Vec<String>,
    },
    /// Show effective settings
    Config {
        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the debounce window in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Print an example settings file instead
        #[arg(long)]
        example: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held until exit so buffered log lines reach the file
    let _log_guard = logging::init(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Watch { path, config, debounce_ms, initial, command } => {
            let settings = settings::resolve(config.as_deref(), debounce_ms)?;
            cmd::watch::run(&path, &command, settings, initial).await
        }
        Commands::Config { config, debounce_ms, example } => {
            if example {
                cmd::config::run_example().await
            } else {
                cmd::config::run_list(config.as_deref(), debounce_ms).await
            }
        }
    }
}
