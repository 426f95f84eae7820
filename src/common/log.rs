//! Logging setup on top of `tracing`.
//!
//! Stages emit `tracing` events with a `stage` field and, when they finish,
//! a `dur_ms` field. `RUST_LOG` controls the filter (default `info`).

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .try_init()
    } else {
        builder.with_target(true).with_line_number(true).try_init()
    };
    // A subscriber installed by an embedding host wins.
    let _ = result;
}
