//! Logging setup for xcode-png-optim
//!
//! Library crates only emit `tracing` events; this crate decides where they
//! go. Logs are written to stderr so stdout stays clean for summaries and
//! JSON output.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Global session ID for correlating logs
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Initialize logging with defaults
pub fn init() -> anyhow::Result<()> {
    init_with_config(TelemetryConfig::default())
}

/// Initialize with custom configuration
///
/// `RUST_LOG` takes precedence over `config.log_level`.
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| anyhow::anyhow!("Invalid log filter `{}`: {}", config.log_level, e))?;

    let result = if config.json {
        let layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids);
        tracing::subscriber::set_global_default(tracing_subscriber::registry().with(filter).with(layer))
    } else {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .compact();
        tracing::subscriber::set_global_default(tracing_subscriber::registry().with(filter).with(layer))
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    tracing::debug!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}

/// Get the current session ID
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit one JSON object per event
    pub json: bool,
    pub show_target: bool,
    pub show_thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json: false,
            show_target: false,
            show_thread_ids: false,
        }
    }
}

impl TelemetryConfig {
    /// `warn` normally, `debug` with worker thread ids when verbose
    pub fn for_verbosity(verbose: bool) -> Self {
        if verbose {
            Self {
                log_level: "debug".to_string(),
                show_thread_ids: true,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }
}

/// Timer for measuring a phase of a run
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    /// Time since the timer started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and log the duration
    pub fn stop(self) -> Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            phase = %self.name,
            duration_ms = duration.as_millis() as u64,
            "Timer completed"
        );
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer() {
        let timer = Timer::start("scan");
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed().as_millis() >= 10);
        let duration = timer.stop();
        assert!(duration.as_millis() >= 10);
    }

    #[test]
    fn test_session_id() {
        let id = session_id();
        assert!(!id.is_empty());
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(session_id(), id);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(TelemetryConfig::for_verbosity(false).log_level, "warn");
        let verbose = TelemetryConfig::for_verbosity(true);
        assert_eq!(verbose.log_level, "debug");
        assert!(verbose.show_thread_ids);
    }
}
