use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global JSON subscriber.
///
/// `RUST_LOG` takes precedence. Without it, `quiet` limits output to
/// warnings and errors; otherwise worktide crates log at `info`.
pub fn init_logging(quiet: bool) {
    let default_directive = if quiet { "warn" } else { "worktide=info,warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false);

    // A second call (tests, embedding hosts) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}
