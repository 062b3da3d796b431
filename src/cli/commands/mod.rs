//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod ask;
mod check;
mod helpers;
mod locate;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "pagecite")]
#[command(about = "Locate answer excerpts in PDFs and cite their pages")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Address to bind: port, host, or host:port (default from config, else 127.0.0.1:3030)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Find excerpts in a PDF and print the located regions as JSON
    Locate {
        /// PDF file to search
        file: PathBuf,
        /// Excerpt to locate (repeatable)
        #[arg(short, long = "excerpt", required = true)]
        excerpts: Vec<String>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Ask a question about a PDF and print the cited answer
    Ask {
        /// PDF file to ask about
        file: PathBuf,
        /// The question
        question: String,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check PDF backend and LLM availability
    Check,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(LoadOptions {
        config_path: cli.config,
        data_dir: cli.data_dir,
    })
    .await;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            serve::cmd_serve(&settings, &bind).await
        }
        Commands::Locate {
            file,
            excerpts,
            pretty,
        } => locate::cmd_locate(&settings, &file, excerpts, pretty).await,
        Commands::Ask {
            file,
            question,
            json,
        } => ask::cmd_ask(&settings, &file, &question, json).await,
        Commands::Check => check::cmd_check(&settings).await,
    }
}
