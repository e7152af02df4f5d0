//! Diagnostic logging setup.

use std::env;

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` isn't set.
///
/// `DEBUG=yes` is honoured as well as `--verbose`; both print every `git`
/// and `gh` command as it runs.
pub fn default_filter(verbose: bool, debug_env: Option<&str>) -> &'static str {
    if verbose || debug_env == Some("yes") {
        "gh_pr_upsert=debug"
    } else {
        "warn"
    }
}

/// Install the global subscriber, writing to stderr.
pub fn init(verbose: bool) {
    let debug_env = env::var("DEBUG").ok();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, debug_env.as_deref())));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
