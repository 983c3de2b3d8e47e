//! Attribution labels for connection metrics
//!
//! Labels are derived only from fields fixed at request construction, so the
//! same request yields the same set no matter when in its lifetime it is asked.

use std::fmt;

use http::Version;
use opentelemetry::KeyValue;

use crate::request::TracedRequest;

/// Semantic convention attribute keys
pub mod keys {
    pub const SERVER_ADDRESS: &str = "server.address";
    pub const SERVER_PORT: &str = "server.port";
    pub const URL_SCHEME: &str = "url.scheme";
    pub const HTTP_REQUEST_METHOD: &str = "http.request.method";
    pub const NETWORK_PROTOCOL_VERSION: &str = "network.protocol.version";
    pub const HTTP_CONNECTION_STATE: &str = "http.connection.state";
}

/// State dimension of `http.client.open_connections`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Active,
    Idle,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Active => "active",
            ConnectionState::Idle => "idle",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels identifying the connection pool `request` draws from.
///
/// Idle connections are shared by every request to the same scheme, host and
/// port, so `http.client.open_connections` is keyed by these alone.
#[must_use]
pub fn pool_attributes(request: &TracedRequest) -> Vec<KeyValue> {
    let (server_address, server_port, scheme) = pool_identity(request);
    vec![
        KeyValue::new(keys::SERVER_ADDRESS, server_address.to_string()),
        KeyValue::new(keys::SERVER_PORT, i64::from(server_port)),
        KeyValue::new(keys::URL_SCHEME, scheme.to_string()),
    ]
}

/// Pool labels plus the request-scoped ones, for per-dial metrics.
#[must_use]
pub fn metric_attributes(request: &TracedRequest) -> Vec<KeyValue> {
    let mut attributes = pool_attributes(request);
    attributes.push(KeyValue::new(
        keys::HTTP_REQUEST_METHOD,
        request.method().as_str().to_string(),
    ));
    attributes.push(KeyValue::new(
        keys::NETWORK_PROTOCOL_VERSION,
        protocol_version(request.version()),
    ));
    attributes
}

fn pool_identity(request: &TracedRequest) -> (&str, u16, &str) {
    let uri = request.uri();
    let scheme = uri.scheme_str().unwrap_or("http");
    let (host_header, host_header_port) = request
        .host()
        .map(split_host_port)
        .unwrap_or((None, None));

    let server_address = uri.host().or(host_header).unwrap_or_default();
    let server_port = uri
        .port_u16()
        .or(host_header_port)
        .unwrap_or_else(|| default_port(scheme));
    (server_address, server_port, scheme)
}

/// `base` plus the connection state dimension.
#[must_use]
pub fn open_connection_attributes(state: ConnectionState, base: &[KeyValue]) -> Vec<KeyValue> {
    let mut attributes = Vec::with_capacity(base.len() + 1);
    attributes.extend_from_slice(base);
    attributes.push(KeyValue::new(keys::HTTP_CONNECTION_STATE, state.as_str()));
    attributes
}

fn default_port(scheme: &str) -> u16 {
    if scheme.eq_ignore_ascii_case("https") {
        443
    } else {
        80
    }
}

fn protocol_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

// Host headers may carry a port and, for IPv6 literals, brackets.
fn split_host_port(host: &str) -> (Option<&str>, Option<u16>) {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((addr, tail)) => (
                Some(addr),
                tail.strip_prefix(':').and_then(|p| p.parse().ok()),
            ),
            None => (Some(host), None),
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') => (Some(name), port.parse().ok()),
        _ => (Some(host), None),
    }
}
