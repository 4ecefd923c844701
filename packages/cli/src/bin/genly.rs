// ABOUTME: Entry point for the genly command line tool
// ABOUTME: Turns natural language commands into Python, runs it and repairs failures

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process;

mod cli;

#[derive(Parser)]
#[command(name = "genly")]
#[command(about = "Genly - natural language to working Python, with automatic repair")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single command through the generate and repair loop
    Run {
        /// What the program should do
        command: String,

        /// Task category used to look up preference context
        #[arg(long)]
        category: Option<String>,

        /// Override GENLY_MAX_REPAIRS
        #[arg(long)]
        max_repairs: Option<u32>,

        /// Execute on this machine instead of in an E2B sandbox
        #[arg(long)]
        local: bool,

        #[arg(long, default_value = ".", help = "Directory for generated artifacts")]
        artifacts_dir: PathBuf,
    },
    /// Interactive session; each line is a command
    Chat {
        #[arg(long)]
        local: bool,

        #[arg(long, default_value = ".", help = "Directory for generated artifacts")]
        artifacts_dir: PathBuf,
    },
    /// Show the resolved configuration
    Config {
        #[arg(long)]
        local: bool,
    },
}

#[tokio::main]
async fn main() {
    genly_cli::init_tracing();
    let cli = Cli::parse();

    if let Err(e) = handle_command(cli.command).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            command,
            category,
            max_repairs,
            local,
            artifacts_dir,
        } => {
            let mut config = cli::load_config(local)?;
            if let Some(max_repairs) = max_repairs {
                config.max_repairs = max_repairs;
            }
            cli::run::run_command(&config, command, category, artifacts_dir).await
        }
        Commands::Chat {
            local,
            artifacts_dir,
        } => {
            let config = cli::load_config(local)?;
            cli::chat::chat(&config, artifacts_dir).await
        }
        Commands::Config { local } => {
            let config = cli::load_config(local)?;
            cli::config::show(&config);
            Ok(())
        }
    }
}
