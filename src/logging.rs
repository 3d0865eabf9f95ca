//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events; embedding applications call
//! one of these once at startup. `RUST_LOG` wins over the passed default.
//! Calling either twice is a no-op.

use tracing_subscriber::EnvFilter;

fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a human-readable subscriber writing to stderr
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let is_tty = std::io::IsTerminal::is_terminal(&std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_filter))
        .with_ansi(is_tty)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Install a JSON-lines subscriber writing to stderr
pub fn init_json_tracing(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(default_filter))
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
