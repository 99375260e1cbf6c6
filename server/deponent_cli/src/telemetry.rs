//! Console logging setup.
//!
//! `RUST_LOG` takes precedence over the configured level. Logs go to stderr
//! so stdout stays clean for JSON output.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `log_format` is `"text"` or `"json"`.
pub fn init_logging(log_level: &str, log_format: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let (json_layer, text_layer) = if log_format == "json" {
        let json = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        (Some(json), None)
    } else {
        let text = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_writer(std::io::stderr);
        (None, Some(text))
    };

    // `Option<Layer>` is a no-op layer when `None`.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
