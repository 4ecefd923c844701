// ABOUTME: One-shot `genly run` command
// ABOUTME: Handles a single request and writes the artifacts of a successful run

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::*;
use genly_cli::artifacts::ArtifactWriter;
use genly_cli::output::{render_response, ConsoleObserver};
use genly_config::Config;
use genly_core::{Agent, Response, UserRequest};

pub async fn run_command(
    config: &Config,
    command: String,
    category: Option<String>,
    artifacts_dir: PathBuf,
) -> Result<()> {
    let mut agent = Agent::from_config(config).context("Failed to set up collaborators")?;
    let mut writer = ArtifactWriter::new(artifacts_dir);

    let request = UserRequest::new(command).with_category(category);
    let response = agent.handle(&request, &ConsoleObserver).await?;

    report(&response, &mut writer)?;

    if !response.outcome.succeeded() {
        anyhow::bail!(
            "request still failing after {} repair(s)",
            response.outcome.repairs
        );
    }
    Ok(())
}

/// Print the response and save its artifacts
pub fn report(response: &Response, writer: &mut ArtifactWriter) -> Result<()> {
    if let Some(context) = &response.context {
        println!("{}\n{}\n", "Preference Context".blue().bold(), context);
    }

    print!("{}", render_response(response));

    let saved = writer
        .write_outcome(&response.outcome)
        .context("Failed to write artifacts")?;
    for artifact in saved {
        println!(
            "{} {} {}",
            "Saved".green(),
            artifact.label(),
            artifact.path.display()
        );
    }

    let discarded = response.outcome.output.artifacts.len();
    if !response.outcome.succeeded() && discarded > 0 {
        println!(
            "{}",
            format!("{} artifact(s) from the failed run were not saved", discarded).yellow()
        );
    }
    Ok(())
}
