//! Timestamped logging with per-module levels.
//!
//! `RUST_LOG` overrides the `[logging]` section when set:
//!
//! ```toml
//! [logging]
//! default = "info"
//!
//! [logging.modules]
//! "election_feed::watcher" = "debug"
//! ```
//!
//! ```bash
//! RUST_LOG=election_feed::pipeline=trace election-feed run
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// HH:MM:SS.mmm in local time.
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Build the filter directive string for a logging config.
pub fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = config.default.clone();
    for (module, level) in &config.modules {
        directives.push_str(&format!(",{module}={level}"));
    }
    directives
}

/// Install the global subscriber.
///
/// Only the first call has any effect.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(config))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Log a pipeline event at info level.
///
/// ```ignore
/// log_event!("publish", "raw", "{} -> {}", path.display(), key);
/// log_event!("sync", "started");
/// ```
#[macro_export]
macro_rules! log_event {
    ($stage:expr, $event:expr) => {
        tracing::info!("[{}] {}", $stage, $event)
    };
    ($stage:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $stage, $event, format!($($arg)*))
    };
}

/// Same as [`log_event!`] at warn level.
#[macro_export]
macro_rules! warn_event {
    ($stage:expr, $event:expr) => {
        tracing::warn!("[{}] {}", $stage, $event)
    };
    ($stage:expr, $event:expr, $($arg:tt)*) => {
        tracing::warn!("[{}] {}: {}", $stage, $event, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_event {
    ($stage:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $stage, $event)
    };
    ($stage:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $stage, $event, format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_include_modules() {
        let mut config = LoggingConfig::default();
        config.default = "warn".to_string();
        config
            .modules
            .insert("election_feed::watcher".to_string(), "debug".to_string());

        assert_eq!(
            filter_directives(&config),
            "warn,election_feed::watcher=debug"
        );
    }

    #[test]
    fn test_filter_directives_default() {
        assert_eq!(filter_directives(&LoggingConfig::default()), "info");
    }
}
