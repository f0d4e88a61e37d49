//! Tracing subscriber setup for the binary.
//!
//! Library code only emits `tracing` events; nothing is printed unless a
//! subscriber is installed here.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Returns the filter directive for a `-v` count.
///
/// Interactive sessions (the TUI) stay silent unless asked, since log lines
/// on stderr would tear the terminal screen.
///
/// # Examples
///
/// ```
/// use sysrev::logging::default_directive;
///
/// assert_eq!(default_directive(0, false), "sysrev=warn");
/// assert_eq!(default_directive(0, true), "off");
/// assert_eq!(default_directive(2, true), "sysrev=debug");
/// ```
pub fn default_directive(verbosity: u8, interactive: bool) -> &'static str {
    match (verbosity, interactive) {
        (0, true) => "off",
        (0, false) => "sysrev=warn",
        (1, _) => "sysrev=info",
        (2, _) => "sysrev=debug",
        _ => "sysrev=trace",
    }
}

/// Installs a stderr `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over the verbosity-derived default.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(verbosity: u8, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, interactive)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}
