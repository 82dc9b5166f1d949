//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured level when set

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Build the filter used by the subscriber from `RUST_LOG` and `config`.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    build_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), config)
}

/// A parseable `rust_log` wins; otherwise the configured level applies to this crate.
fn build_filter(rust_log: Option<&str>, config: &ObservabilityConfig) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("serverpp={}", config.log_level.to_ascii_lowercase())))
}

/// Install the global tracing subscriber.
///
/// Returns an error if a subscriber was already installed.
pub fn init(config: &ObservabilityConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(level: &str) -> ObservabilityConfig {
        ObservabilityConfig {
            log_level: level.to_string(),
            ..ObservabilityConfig::default()
        }
    }

    #[test]
    fn configured_level_used_without_rust_log() {
        assert_eq!(build_filter(None, &config("DEBUG")).to_string(), "serverpp=debug");
    }

    #[test]
    fn rust_log_overrides_configured_level() {
        assert_eq!(build_filter(Some("warn"), &config("trace")).to_string(), "warn");
    }

    #[test]
    fn unparseable_rust_log_falls_back() {
        assert_eq!(build_filter(Some("serverpp=loud"), &config("info")).to_string(), "serverpp=info");
    }
}
