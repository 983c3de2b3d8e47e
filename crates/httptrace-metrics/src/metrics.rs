//! OpenTelemetry instruments for HTTP client connections
//!
//! Provides the `http.client.open_connections` up/down counter and the
//! `http.client.connection_duration` histogram, behind small traits so tests
//! and alternative backends can stand in for the OpenTelemetry SDK.

use std::sync::{Arc, OnceLock};

use opentelemetry::{
    Context, InstrumentationScope, KeyValue, global,
    metrics::{Histogram, Meter, UpDownCounter},
};
use tracing::{trace, warn};

use crate::config::{DEFAULT_DURATION_BOUNDARIES, MetricsOptions};
use crate::error::{MetricsError, Result};

pub const OPEN_CONNECTIONS: &str = "http.client.open_connections";
pub const CONNECTION_DURATION: &str = "http.client.connection_duration";

/// Additive instrument that can go up and down.
pub trait Int64UpDownCounter: Send + Sync {
    fn add(&self, cx: &Context, delta: i64, attributes: &[KeyValue]);
}

/// Distribution instrument.
pub trait Float64Histogram: Send + Sync {
    fn record(&self, cx: &Context, value: f64, attributes: &[KeyValue]);
}

impl Int64UpDownCounter for UpDownCounter<i64> {
    fn add(&self, cx: &Context, delta: i64, attributes: &[KeyValue]) {
        let _guard = cx.clone().attach();
        UpDownCounter::add(self, delta, attributes);
    }
}

impl Float64Histogram for Histogram<f64> {
    fn record(&self, cx: &Context, value: f64, attributes: &[KeyValue]) {
        let _guard = cx.clone().attach();
        Histogram::record(self, value, attributes);
    }
}

/// Instrument handles used by connection tracers.
///
/// An absent handle turns the corresponding update into a no-op.
#[derive(Clone, Default)]
pub struct ClientMetrics {
    open_connections: Option<Arc<dyn Int64UpDownCounter>>,
    connection_duration: Option<Arc<dyn Float64Histogram>>,
}

impl std::fmt::Debug for ClientMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientMetrics")
            .field("open_connections", &self.open_connections.is_some())
            .field("connection_duration", &self.connection_duration.is_some())
            .finish()
    }
}

impl ClientMetrics {
    /// Create the instruments on `meter` with the default bucket layout
    #[must_use]
    pub fn new(meter: &Meter) -> Self {
        Self::build(meter, DEFAULT_DURATION_BOUNDARIES.to_vec())
    }

    /// Bundle without instruments; every update is dropped
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Bundle over caller-supplied instruments
    #[must_use]
    pub fn with_instruments(
        open_connections: Option<Arc<dyn Int64UpDownCounter>>,
        connection_duration: Option<Arc<dyn Float64Histogram>>,
    ) -> Self {
        Self {
            open_connections,
            connection_duration,
        }
    }

    /// Create the instruments as configured, refusing disabled or invalid options
    pub fn try_new(meter: &Meter, options: &MetricsOptions) -> Result<Self> {
        if !options.enabled {
            return Err(MetricsError::Disabled);
        }
        options.validate()?;
        Ok(Self::build(meter, options.duration_boundaries.clone()))
    }

    /// Create the instruments as configured. Disabled options give the no-op
    /// bundle; invalid boundaries fall back to the defaults.
    #[must_use]
    pub fn from_options(meter: &Meter, options: &MetricsOptions) -> Self {
        match Self::try_new(meter, options) {
            Ok(metrics) => metrics,
            Err(MetricsError::Disabled) => Self::disabled(),
            Err(e) => {
                warn!(error = %e, "Falling back to default connection metric buckets");
                Self::new(meter)
            }
        }
    }

    fn build(meter: &Meter, boundaries: Vec<f64>) -> Self {
        let open_connections = meter
            .i64_up_down_counter(OPEN_CONNECTIONS)
            .with_description("Number of outbound HTTP connections that are currently active or idle")
            .with_unit("{connection}")
            .build();

        let connection_duration = meter
            .f64_histogram(CONNECTION_DURATION)
            .with_description("Duration of successfully and unsuccessfully established outbound HTTP connections")
            .with_unit("ms")
            .with_boundaries(boundaries)
            .build();

        Self {
            open_connections: Some(Arc::new(open_connections)),
            connection_duration: Some(Arc::new(connection_duration)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.open_connections.is_some() || self.connection_duration.is_some()
    }

    /// Add `delta` to the open connection count.
    pub fn add_open_connections(&self, cx: &Context, delta: i64, attributes: &[KeyValue]) {
        match &self.open_connections {
            Some(counter) => counter.add(cx, delta, attributes),
            None => trace!(delta, "no {OPEN_CONNECTIONS} instrument, update dropped"),
        }
    }

    /// Record one connect duration in milliseconds.
    pub fn record_connection_duration(&self, cx: &Context, millis: f64, attributes: &[KeyValue]) {
        match &self.connection_duration {
            Some(histogram) => histogram.record(cx, millis, attributes),
            None => trace!(millis, "no {CONNECTION_DURATION} instrument, update dropped"),
        }
    }
}

static GLOBAL_METRICS: OnceLock<Arc<ClientMetrics>> = OnceLock::new();

/// Process-wide instruments, created on first use from [`MetricsOptions::default`]
/// against the global meter provider.
#[must_use]
pub fn client_metrics() -> Arc<ClientMetrics> {
    GLOBAL_METRICS
        .get_or_init(|| {
            let options = MetricsOptions::default();
            let scope = InstrumentationScope::builder(options.meter_name.clone()).build();
            let meter = global::meter_with_scope(scope);
            Arc::new(ClientMetrics::from_options(&meter, &options))
        })
        .clone()
}
