// ABOUTME: Library side of the genly binary
// ABOUTME: Logging setup, terminal rendering of loop events and artifact output

pub mod artifacts;
pub mod output;

use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber, honoring `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
