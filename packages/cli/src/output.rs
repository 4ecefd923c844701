// ABOUTME: Terminal rendering for loop events, final responses and configuration
// ABOUTME: Every repair shows the error text and the corrected response

use colored::*;
use genly_config::{mask_secret, Config, ExecutionMode};
use genly_core::{LoopEvent, LoopObserver, LoopState, Response};

/// Prints loop progress to stdout
pub struct ConsoleObserver;

impl LoopObserver for ConsoleObserver {
    fn on_event(&self, event: &LoopEvent) {
        if let Some(text) = render_event(event) {
            println!("{}", text);
        }
    }
}

pub fn render_event(event: &LoopEvent) -> Option<String> {
    match event {
        LoopEvent::StateChanged(LoopState::Generating) => {
            Some("Generating code...".dimmed().to_string())
        }
        LoopEvent::StateChanged(LoopState::Executing) => {
            Some("Running code...".dimmed().to_string())
        }
        LoopEvent::StateChanged(_) => None,
        LoopEvent::Generated { response } => {
            Some(format!("{}\n{}\n", "Response".blue().bold(), response))
        }
        LoopEvent::Executed { .. } => None,
        LoopEvent::ExecutionFailed { errors, .. } => {
            Some(format!("{}\n{}\n", "Execution Errors".red().bold(), errors.red()))
        }
        LoopEvent::Corrected { repair, response } => Some(format!(
            "{}\n{}\n",
            format!("Corrected Code (repair {})", repair).yellow().bold(),
            response
        )),
        LoopEvent::Rerunning { .. } => Some("Running the corrected code...".dimmed().to_string()),
    }
}

pub fn render_response(response: &Response) -> String {
    let outcome = &response.outcome;
    let mut out = String::new();

    if outcome.succeeded() {
        out.push_str(&format!("{}\n", "Execution Output".green().bold()));
        out.push_str(&outcome.output.stdout);
        out.push('\n');
    } else {
        let reason = outcome
            .failure
            .as_ref()
            .map(|f| f.describe())
            .unwrap_or_else(|| "unknown failure".to_string());
        out.push_str(&format!(
            "{}\n",
            format!(
                "Gave up after {} repair(s): {}",
                outcome.repairs, reason
            )
            .red()
            .bold()
        ));
        out.push_str(&outcome.output.combined_output());
        out.push('\n');
    }

    match (&response.summary, &response.summary_error) {
        (Some(summary), _) => {
            out.push_str(&format!("\n{}\n{}\n", "Summary".cyan().bold(), summary));
        }
        (None, Some(err)) => {
            out.push_str(&format!(
                "\n{}\n",
                format!("Summary unavailable: {}", err).yellow()
            ));
        }
        (None, None) => {}
    }

    out
}

/// Resolved configuration as label and value pairs, credentials masked
pub fn config_lines(config: &Config) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        ("Model", config.model.model.clone()),
        ("Anthropic API key", mask_secret(&config.model.api_key)),
        ("Anthropic API URL", config.model.api_url.clone()),
        ("Max tokens", config.model.max_tokens.to_string()),
        ("Temperature", config.model.temperature.to_string()),
        ("Max repairs", config.max_repairs.to_string()),
        (
            "Additional context",
            config
                .additional_context
                .clone()
                .unwrap_or_else(|| "(none)".to_string()),
        ),
    ];

    match config.sandbox.mode {
        ExecutionMode::Local => {
            lines.push(("Execution", "local".to_string()));
            lines.push((
                "Working directory",
                config.sandbox.local.work_dir.display().to_string(),
            ));
            lines.push(("Python", config.sandbox.local.python.clone()));
            lines.push(("Pip", config.sandbox.local.pip.clone()));
        }
        ExecutionMode::Remote => lines.push(("Execution", "remote (E2B)".to_string())),
    }

    if let Some(remote) = &config.sandbox.remote {
        lines.push(("E2B API key", mask_secret(&remote.api_key)));
        lines.push(("E2B API URL", remote.api_url.clone()));
        lines.push(("E2B template", remote.template.clone()));
    }

    if let Some(prefs) = &config.preferences {
        lines.push(("Preference service", prefs.url.clone()));
        lines.push(("Preferred providers", prefs.providers.join(", ")));
    }

    lines
}
