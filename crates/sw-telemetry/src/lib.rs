//! # Seekwire Telemetry
//!
//! Logging and metrics shared by every seekwire crate.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events rendered by `tracing-subscriber` to stderr,
//!   human-readable or JSON
//! - **Metrics**: Prometheus counters, gauges and histograms in one registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sw_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SW_SERVICE_NAME` | `seekwire` | Service name in the startup log |
//! | `SW_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `SW_CONSOLE_OUTPUT` | `true` | Emit logs at all |
//! | `SW_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//!
//! Subprocess stderr is logged under the [`SUBPROCESS_TARGET`] target, so
//! `RUST_LOG=seekwire::subprocess=off` silences it on its own.

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{gather_metrics, register_metrics, HistogramTimer, MetricsHandle};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Log target for lines the subprocess writes to stderr.
pub const SUBPROCESS_TARGET: &str = "seekwire::subprocess";

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_tracing(&config)?;

    Ok(TelemetryGuard { metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Metrics registry handle.
    #[must_use]
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
