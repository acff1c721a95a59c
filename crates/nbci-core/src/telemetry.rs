//! Tracing initialisation for nbci binaries.
//!
//! Call [`init_tracing`] once at program start to configure the global
//! subscriber. Safe to call more than once; subsequent calls are silently
//! ignored (the global subscriber can only be set once per process).

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directives when `RUST_LOG` is not set: the requested
/// level for nbci itself, with the HTTP client internals (pulled in by the
/// template downloader) capped at warn so debug runs stay readable.
fn default_directives(level: Level) -> String {
    format!("{level},hyper=warn,reqwest=warn,rustls=warn")
}

/// Initialise the global tracing subscriber.
///
/// * `json`: when `true`, emit newline-delimited JSON log lines.
/// * `level`: default verbosity when `RUST_LOG` is not set.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}
