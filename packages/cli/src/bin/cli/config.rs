// ABOUTME: `genly config` command
// ABOUTME: Prints the resolved configuration with credentials masked

use colored::*;
use genly_cli::output::config_lines;
use genly_config::Config;

pub fn show(config: &Config) {
    println!("{}", "Genly Configuration".blue().bold());
    println!();
    for (label, value) in config_lines(config) {
        println!("{} {}", format!("{:<22}", format!("{}:", label)).bold(), value.cyan());
    }
}
