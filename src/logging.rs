//! Tracing setup. Everything goes to stderr because stdout carries the MCP
//! stream when serving.

use tracing_subscriber::EnvFilter;

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "substack_mcp=debug"
    } else {
        "substack_mcp=info"
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init(verbose: bool, ansi: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .try_init();
}
