//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events; applications and tests that want
//! to see them call [`init_logging`] once.

use crate::config::LoggingConfig;
use std::env;
use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber for `config`.
///
/// `MATCHPLAN_LOG` overrides the configured level with any `EnvFilter`
/// directive. Returns false when a global subscriber was already set, in
/// which case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    // Environment variable takes precedence over config file value
    let directive = env::var("MATCHPLAN_LOG").unwrap_or_else(|_| config.level.clone());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true);

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if config.format == "json" {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.compact().finish())
    };

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
