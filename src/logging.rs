//! Log subscriber setup for the CLI.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's job. Output goes to stderr so `--json` stdout stays parseable.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "simple_resize=debug"
    } else {
        "simple_resize=info"
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// Calling this twice is harmless; the second install is ignored.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}
