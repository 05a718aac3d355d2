//! Tracing subscriber setup

use greenwindow_domain::{GreenWindowError, LoggingConfig, Result};
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter used when `RUST_LOG` is not set.
///
/// HTTP plumbing is kept at `warn` so request logs come from our own spans.
pub fn default_filter(level: &str) -> Result<EnvFilter> {
    let directives = format!("{level},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn");
    EnvFilter::try_new(&directives)
        .map_err(|e| GreenWindowError::Config(format!("Invalid log level '{level}': {e}")))
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level`. With `logging.json` every event is
/// emitted as one JSON object per line on stderr.
///
/// # Errors
/// Returns `GreenWindowError::Config` for an unparsable level, or
/// `GreenWindowError::Internal` if a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(&config.level)?,
    };

    let output = if config.json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(false)
            .compact()
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(|e| GreenWindowError::Internal(format!("Failed to install tracing subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_accepts_plain_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(default_filter(level).is_ok(), "{level}");
        }
    }

    #[test]
    fn default_filter_rejects_garbage() {
        assert!(matches!(default_filter("loud=[["), Err(GreenWindowError::Config(_))));
    }
}
