//! Connection metrics tracer
//!
//! [`MetricsTrace`] keeps `http.client.open_connections` and
//! `http.client.connection_duration` up to date from a request's lifecycle
//! hooks, then hands every hook on to the observer it wraps.
//!
//! Open connection accounting per connection, keyed by the pool the request
//! draws from (`server.address`, `server.port`, `url.scheme`) and the state:
//!
//! | Event | active | idle |
//! |---|---|---|
//! | `got_conn` fresh dial | +1 | |
//! | `got_conn` out of the idle pool | +1 | -1 |
//! | `got_conn` reused while active | | |
//! | `put_idle_conn` ok | -1 | +1 |
//! | `put_idle_conn` failed | -1 | |

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{HeaderMap, StatusCode};
use opentelemetry::KeyValue;
use tracing::trace;

use crate::attributes::{
    ConnectionState, metric_attributes, open_connection_attributes, pool_attributes,
};
use crate::clock::{Clock, SystemClock};
use crate::metrics::{ClientMetrics, client_metrics};
use crate::request::TracedRequest;
use crate::trace::{
    BoxError, ClientTrace, DnsDoneInfo, DnsStartInfo, GotConnInfo, NoopTrace, TlsConnectionState,
    TraceError, WroteRequestInfo,
};

/// Wrap `delegate` with connection metrics for `request`, using the
/// process-wide instruments.
///
/// The result can be installed wherever `delegate` would have been: every hook
/// still reaches it with the same arguments.
#[must_use]
pub fn new_client_trace(
    request: Arc<TracedRequest>,
    delegate: Option<Box<dyn ClientTrace>>,
) -> Box<dyn ClientTrace> {
    Box::new(MetricsTrace::new(request, delegate, client_metrics()))
}

/// Per-request observer that maintains connection metrics.
pub struct MetricsTrace {
    request: Arc<TracedRequest>,
    delegate: Box<dyn ClientTrace>,
    metrics: Arc<ClientMetrics>,
    clock: Arc<dyn Clock>,
    // Shared by overlapping dials; the latest start wins.
    connect_start: Option<Instant>,
}

impl MetricsTrace {
    #[must_use]
    pub fn new(
        request: Arc<TracedRequest>,
        delegate: Option<Box<dyn ClientTrace>>,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self {
            request,
            delegate: delegate.unwrap_or_else(|| Box::new(NoopTrace)),
            metrics,
            clock: Arc::new(SystemClock),
            connect_start: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // Gauge labels, or `None` when no instrument would take the update.
    fn pool_labels(&self, hook: &'static str) -> Option<Vec<KeyValue>> {
        if !self.metrics.is_enabled() {
            trace!(hook, "connection metrics disabled, open_connections update dropped");
            return None;
        }
        Some(pool_attributes(&self.request))
    }

    fn add_open_connections(&self, pool: &[KeyValue], state: ConnectionState, delta: i64) {
        self.metrics.add_open_connections(
            self.request.context(),
            delta,
            &open_connection_attributes(state, pool),
        );
    }
}

fn as_millis_f64(elapsed: Duration) -> f64 {
    elapsed.as_micros() as f64 / 1000.0
}

impl ClientTrace for MetricsTrace {
    fn get_conn(&mut self, host_port: &str) {
        self.delegate.get_conn(host_port);
    }

    fn got_conn(&mut self, info: &GotConnInfo) {
        if !info.reused
            && let Some(pool) = self.pool_labels("got_conn")
        {
            self.add_open_connections(&pool, ConnectionState::Active, 1);
            if info.was_idle {
                self.add_open_connections(&pool, ConnectionState::Idle, -1);
            }
        }
        self.delegate.got_conn(info);
    }

    fn put_idle_conn(&mut self, err: Option<&TraceError>) {
        if let Some(pool) = self.pool_labels("put_idle_conn") {
            self.add_open_connections(&pool, ConnectionState::Active, -1);
            if err.is_none() {
                self.add_open_connections(&pool, ConnectionState::Idle, 1);
            }
        }
        self.delegate.put_idle_conn(err);
    }

    fn got_first_response_byte(&mut self) {
        self.delegate.got_first_response_byte();
    }

    fn got_100_continue(&mut self) {
        self.delegate.got_100_continue();
    }

    fn got_1xx_response(&mut self, code: StatusCode, header: &HeaderMap) -> Result<(), BoxError> {
        self.delegate.got_1xx_response(code, header)
    }

    fn dns_start(&mut self, info: &DnsStartInfo) {
        self.delegate.dns_start(info);
    }

    fn dns_done(&mut self, info: &DnsDoneInfo) {
        self.delegate.dns_done(info);
    }

    fn connect_start(&mut self, network: &str, addr: &str) {
        self.request.set_remote_addr_if_empty(addr);
        self.connect_start = Some(self.clock.now());
        self.delegate.connect_start(network, addr);
    }

    fn connect_done(&mut self, network: &str, addr: &str, err: Option<&TraceError>) {
        match self.connect_start {
            Some(_) if !self.metrics.is_enabled() => {
                trace!(network, addr, "connection metrics disabled, duration dropped");
            }
            Some(start) => {
                let elapsed = self.clock.now().saturating_duration_since(start);
                self.metrics.record_connection_duration(
                    self.request.context(),
                    as_millis_f64(elapsed),
                    &metric_attributes(&self.request),
                );
            }
            None => trace!(network, addr, "connect_done without connect_start, duration dropped"),
        }
        self.delegate.connect_done(network, addr, err);
    }

    fn tls_handshake_start(&mut self) {
        self.delegate.tls_handshake_start();
    }

    fn tls_handshake_done(&mut self, state: &TlsConnectionState, err: Option<&TraceError>) {
        self.delegate.tls_handshake_done(state, err);
    }

    fn wrote_header_field(&mut self, key: &str, values: &[String]) {
        self.delegate.wrote_header_field(key, values);
    }

    fn wrote_headers(&mut self) {
        self.delegate.wrote_headers();
    }

    fn wait_100_continue(&mut self) {
        self.delegate.wait_100_continue();
    }

    fn wrote_request(&mut self, info: &WroteRequestInfo) {
        self.delegate.wrote_request(info);
    }
}
