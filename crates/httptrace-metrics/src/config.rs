//! # Metrics Options
//!
//! Controls whether connection metrics are emitted, which meter they are
//! registered on, and the bucket layout of the connect-duration histogram.
//!
//! ## Environment
//!
//! * `HTTPTRACE_METRICS_ENABLED` - `false`, `0`, `off` or `no` disables emission
//! * `HTTPTRACE_METRICS_METER` - name of the OpenTelemetry meter
//! * `HTTPTRACE_CONNECT_BUCKETS` - comma separated bucket boundaries in milliseconds
//!
//! ## Example
//!
//! ```rust
//! use httptrace_metrics::MetricsOptions;
//!
//! let options = MetricsOptions {
//!     enabled: true,
//!     meter_name: "my-client".to_string(),
//!     ..Default::default()
//! };
//! assert!(options.validate().is_ok());
//! ```

use crate::error::{MetricsError, Result};

/// Meter name used when none is configured
pub const DEFAULT_METER_NAME: &str = "httptrace-metrics";

/// Connect-duration bucket boundaries in milliseconds
pub const DEFAULT_DURATION_BOUNDARIES: &[f64] = &[
    1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0, 5000.0, 7500.0,
    10000.0, 30000.0, 60000.0,
];

/// Settings for the connection metrics instruments
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsOptions {
    /// Emit metrics at all
    /// Default: true
    pub enabled: bool,
    /// Name of the meter the instruments are registered on
    /// Default: "httptrace-metrics"
    pub meter_name: String,
    /// Explicit histogram boundaries for `http.client.connection_duration`, in milliseconds
    /// Default: [`DEFAULT_DURATION_BOUNDARIES`]
    pub duration_boundaries: Vec<f64>,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        let enabled = std::env::var("HTTPTRACE_METRICS_ENABLED")
            .map(|s| parse_enabled(&s))
            .unwrap_or(true);

        let meter_name = std::env::var("HTTPTRACE_METRICS_METER")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_METER_NAME.to_string());

        let duration_boundaries = std::env::var("HTTPTRACE_CONNECT_BUCKETS")
            .ok()
            .and_then(|s| parse_boundaries(&s))
            .unwrap_or_else(|| DEFAULT_DURATION_BOUNDARIES.to_vec());

        Self {
            enabled,
            meter_name,
            duration_boundaries,
        }
    }
}

impl MetricsOptions {
    /// Options that never emit anything
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            meter_name: DEFAULT_METER_NAME.to_string(),
            duration_boundaries: DEFAULT_DURATION_BOUNDARIES.to_vec(),
        }
    }

    /// Check that the meter name is usable and the boundaries are finite,
    /// non-negative and strictly increasing.
    pub fn validate(&self) -> Result<()> {
        if self.meter_name.trim().is_empty() {
            return Err(MetricsError::Config("meter name must not be empty".to_string()));
        }
        if let Some(bad) = self
            .duration_boundaries
            .iter()
            .find(|b| !b.is_finite() || **b < 0.0)
        {
            return Err(MetricsError::Config(format!(
                "bucket boundary {bad} must be finite and non-negative"
            )));
        }
        if self.duration_boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MetricsError::Config(
                "bucket boundaries must be strictly increasing".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_enabled(s: &str) -> bool {
    !matches!(
        s.trim().to_lowercase().as_str(),
        "false" | "0" | "off" | "no"
    )
}

fn parse_boundaries(s: &str) -> Option<Vec<f64>> {
    s.split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()
        .filter(|v| !v.is_empty())
}
