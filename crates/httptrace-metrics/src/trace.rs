//! Connection lifecycle hooks for outbound HTTP requests
//!
//! A transport drives one [`ClientTrace`] per request, calling its hooks in
//! the order a connection progresses:
//!
//! ```text
//! get_conn -> [dns_start -> dns_done] -> [connect_start -> connect_done]*
//!          -> [tls_handshake_start -> tls_handshake_done] -> got_conn
//!          -> wrote_header_field* -> wrote_headers -> [wait_100_continue]
//!          -> wrote_request+ -> [got_1xx_response* | got_100_continue]
//!          -> got_first_response_byte -> put_idle_conn
//! ```
//!
//! Every hook has an empty default body, so an observer only implements the
//! events it cares about.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, StatusCode};

/// Error reported to a hook by the transport.
pub type TraceError = dyn std::error::Error + Send + Sync;

/// Error a hook may return to abort the request.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connection handed to the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GotConnInfo {
    /// The connection was used before for another request.
    pub reused: bool,
    /// The connection came out of the idle pool. Only meaningful when `reused` is false.
    pub was_idle: bool,
    /// How long the connection sat idle, when `was_idle`.
    pub idle_time: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsStartInfo {
    pub host: String,
}

#[derive(Debug, Clone, Default)]
pub struct DnsDoneInfo {
    pub addrs: Vec<IpAddr>,
    pub err: Option<Arc<TraceError>>,
    /// Lookup was shared with another caller looking up the same host.
    pub coalesced: bool,
}

/// Negotiated TLS parameters, as far as the transport reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConnectionState {
    pub version: Option<String>,
    pub cipher_suite: Option<String>,
    pub server_name: Option<String>,
    pub negotiated_protocol: Option<String>,
    pub handshake_complete: bool,
    pub did_resume: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WroteRequestInfo {
    pub err: Option<Arc<TraceError>>,
}

/// Observer of a single request's connection lifecycle.
///
/// Hooks are never called concurrently for one request, hence `&mut self`.
#[allow(unused_variables)]
pub trait ClientTrace: Send {
    /// Called before a connection is created or taken from the idle pool.
    /// `host_port` is the target or proxy.
    fn get_conn(&mut self, host_port: &str) {}

    /// Called once a connection is obtained. There is no hook for failure.
    fn got_conn(&mut self, info: &GotConnInfo) {}

    /// Called when the connection is returned to the idle pool. `err` says
    /// why it could not be, if it could not.
    fn put_idle_conn(&mut self, err: Option<&TraceError>) {}

    fn got_first_response_byte(&mut self) {}

    fn got_100_continue(&mut self) {}

    /// Called for every 1xx informational response before the final one.
    /// Returning an error aborts the request with it.
    fn got_1xx_response(&mut self, code: StatusCode, header: &HeaderMap) -> Result<(), BoxError> {
        Ok(())
    }

    fn dns_start(&mut self, info: &DnsStartInfo) {}

    fn dns_done(&mut self, info: &DnsDoneInfo) {}

    /// Called when a dial begins. With dual-stack racing this may fire more
    /// than once before the first `connect_done`.
    fn connect_start(&mut self, network: &str, addr: &str) {}

    /// Called when a dial completes, successfully or not.
    fn connect_done(&mut self, network: &str, addr: &str, err: Option<&TraceError>) {}

    fn tls_handshake_start(&mut self) {}

    fn tls_handshake_done(&mut self, state: &TlsConnectionState, err: Option<&TraceError>) {}

    /// Called after each request header is written, possibly still buffered.
    fn wrote_header_field(&mut self, key: &str, values: &[String]) {}

    fn wrote_headers(&mut self) {}

    /// Called when `Expect: 100-continue` was sent and the body is held back.
    fn wait_100_continue(&mut self) {}

    /// Called with the result of writing the request. Fires again on retries.
    fn wrote_request(&mut self, info: &WroteRequestInfo) {}
}

/// Observer that does nothing. Stands in for an absent delegate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTrace;

impl ClientTrace for NoopTrace {}
