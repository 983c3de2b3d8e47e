//! Connection lifecycle metrics for outbound HTTP clients
//!
//! Maintains two OpenTelemetry instruments from the lifecycle hooks an HTTP
//! transport already emits:
//!
//! - `http.client.open_connections`: up/down counter of connections, split by
//!   `http.connection.state` (`active` or `idle`)
//! - `http.client.connection_duration`: histogram of dial durations in milliseconds
//!
//! The tracer only observes. Every hook is passed on, unchanged, to the
//! observer it wraps, and nothing it does can fail the request.
//!
//! ```rust
//! use std::sync::Arc;
//! use http::{Method, Uri};
//! use httptrace_metrics::{ClientTrace, GotConnInfo, LoggingTrace, TracedRequest, new_client_trace};
//!
//! let request = Arc::new(TracedRequest::new(
//!     Method::GET,
//!     Uri::from_static("https://example.com/"),
//! ));
//! let logging = LoggingTrace::new(&request);
//! let mut trace = new_client_trace(request.clone(), Some(Box::new(logging)));
//!
//! trace.connect_start("tcp", "93.184.216.34:443");
//! trace.connect_done("tcp", "93.184.216.34:443", None);
//! trace.got_conn(&GotConnInfo::default());
//! trace.put_idle_conn(None);
//!
//! assert_eq!(request.remote_addr(), Some("93.184.216.34:443"));
//! ```

pub mod attributes;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod request;
pub mod trace;
pub mod tracer;

pub use attributes::{
    ConnectionState, metric_attributes, open_connection_attributes, pool_attributes,
};
pub use clock::{Clock, SystemClock};
pub use config::MetricsOptions;
pub use error::{MetricsError, Result};
pub use logging::LoggingTrace;
pub use metrics::{ClientMetrics, Float64Histogram, Int64UpDownCounter, client_metrics};
pub use request::TracedRequest;
pub use trace::{
    BoxError, ClientTrace, DnsDoneInfo, DnsStartInfo, GotConnInfo, NoopTrace, TlsConnectionState,
    TraceError, WroteRequestInfo,
};
pub use tracer::{MetricsTrace, new_client_trace};
