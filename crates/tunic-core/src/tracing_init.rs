//! Log subscriber setup for the `tunic` binary.
//!
//! Logs go to stderr. Stdout carries only the client config views, so those
//! can be piped into a file without log lines mixed in.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Build the filter from a `RUST_LOG` value, or from `default_filter` when
/// the value is unset or does not parse.
pub fn env_filter(rust_log: Option<&str>, default_filter: &str) -> EnvFilter {
    match rust_log.map(EnvFilter::try_new) {
        Some(Ok(filter)) => filter,
        Some(Err(e)) => {
            // No subscriber exists yet, so this cannot go through tracing.
            #[allow(clippy::print_stderr)]
            {
                eprintln!("ignoring invalid RUST_LOG ({e}), using {default_filter}");
            }
            EnvFilter::new(default_filter)
        }
        None => EnvFilter::new(default_filter),
    }
}

/// Install the global subscriber. `log_json` switches to one JSON object per
/// line.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = env_filter(rust_log.as_deref(), default_filter);
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
