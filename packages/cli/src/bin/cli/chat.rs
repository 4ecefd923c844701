// ABOUTME: Interactive `genly chat` loop over a single session
// ABOUTME: A failed request is reported and the session carries on

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::*;
use genly_cli::artifacts::ArtifactWriter;
use genly_cli::output::ConsoleObserver;
use genly_config::Config;
use genly_core::{Agent, UserRequest};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::run::report;

const EXIT_COMMANDS: &[&str] = &["exit", "quit"];

pub async fn chat(config: &Config, artifacts_dir: PathBuf) -> Result<()> {
    let mut agent = Agent::from_config(config).context("Failed to set up collaborators")?;
    let mut writer = ArtifactWriter::new(artifacts_dir);

    println!("{}", "Genly chat".blue().bold());
    println!(
        "{}",
        "Type a command, prefix with '[category]' to use preferences, 'exit' to quit".dimmed()
    );
    println!(
        "{}",
        format!("Failing programs are repaired up to {} time(s)", agent.max_repairs()).dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&line) {
            break;
        }

        let request = parse_request(line);
        match agent.handle(&request, &ConsoleObserver).await {
            Ok(response) => {
                if let Err(e) = report(&response, &mut writer) {
                    eprintln!("{} {:#}", "Error:".red().bold(), e);
                }
            }
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }

    tracing::info!("Chat session {} ended", agent.session().id);
    Ok(())
}

/// `[category] command` or just `command`
fn parse_request(line: &str) -> UserRequest {
    if let Some(rest) = line.strip_prefix('[') {
        if let Some((category, command)) = rest.split_once(']') {
            return UserRequest::new(command.trim()).with_category(Some(category.trim().to_string()));
        }
    }
    UserRequest::new(line)
}
