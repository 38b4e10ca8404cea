use readalong::commands;
use readalong::config::Config;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Log to stderr so the pipe output and the TUI stay clean.
///
/// `RUST_LOG` wins when set; otherwise `--debug-log` selects debug output
/// for this crate and the default is warnings only.
fn init_tracing(debug_log: bool) {
    let default = if debug_log { "readalong=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() {
    let cfg = Config::parse().with_env_fallbacks();
    init_tracing(cfg.debug_log);

    // Print error if any, for better diagnostics
    if let Err(e) = commands::run(cfg).await {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
