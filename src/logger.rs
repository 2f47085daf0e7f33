use tracing_subscriber::EnvFilter;

fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "pixpress=error"
    } else if verbose {
        "pixpress=debug"
    } else {
        "pixpress=warn"
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the flags.
///
/// Diagnostics go to stderr so stdout stays reserved for results. Calling
/// this twice is harmless; the second call is ignored.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
