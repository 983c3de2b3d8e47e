//! `tracing` observer for connection lifecycle hooks
//!
//! Emits one event per hook inside an `http.client.connection` span, so the
//! lifecycle of a request shows up as span events when a
//! `tracing-opentelemetry` layer is installed, or as log lines otherwise.
//! Usually chained under [`MetricsTrace`](crate::MetricsTrace).

use http::{HeaderMap, StatusCode};
use opentelemetry::trace::SpanKind;
use tracing::{Span, debug, trace};

use crate::request::TracedRequest;
use crate::trace::{
    BoxError, ClientTrace, DnsDoneInfo, DnsStartInfo, GotConnInfo, TlsConnectionState, TraceError,
    WroteRequestInfo,
};

/// Create the span lifecycle events are recorded on
#[must_use]
pub fn make_connection_span(request: &TracedRequest) -> Span {
    let uri = request.uri();
    let host = uri.host().or(request.host()).unwrap_or_default();
    tracing::debug_span!(
        "http.client.connection",
        otel.name = %format!("{} {}", request.method(), uri),
        otel.kind = ?SpanKind::Client,
        http.request.method = %request.method(),
        url.full = %uri,
        server.address = %host,
        network.peer.address = tracing::field::Empty,
    )
}

/// Observer that logs every hook.
#[derive(Debug)]
pub struct LoggingTrace {
    span: Span,
}

impl LoggingTrace {
    #[must_use]
    pub fn new(request: &TracedRequest) -> Self {
        Self {
            span: make_connection_span(request),
        }
    }
}

impl ClientTrace for LoggingTrace {
    fn get_conn(&mut self, host_port: &str) {
        let _enter = self.span.enter();
        debug!(host_port, "Getting connection");
    }

    fn got_conn(&mut self, info: &GotConnInfo) {
        let _enter = self.span.enter();
        debug!(
            reused = info.reused,
            was_idle = info.was_idle,
            idle_time_ms = info.idle_time.as_millis() as u64,
            "Got connection"
        );
    }

    fn put_idle_conn(&mut self, err: Option<&TraceError>) {
        let _enter = self.span.enter();
        match err {
            None => debug!("Connection returned to idle pool"),
            Some(err) => debug!(error = %err, "Connection not returned to idle pool"),
        }
    }

    fn got_first_response_byte(&mut self) {
        let _enter = self.span.enter();
        trace!("Got first response byte");
    }

    fn got_100_continue(&mut self) {
        let _enter = self.span.enter();
        trace!("Got 100 Continue");
    }

    fn got_1xx_response(&mut self, code: StatusCode, header: &HeaderMap) -> Result<(), BoxError> {
        let _enter = self.span.enter();
        trace!(status = code.as_u16(), headers = header.len(), "Got informational response");
        Ok(())
    }

    fn dns_start(&mut self, info: &DnsStartInfo) {
        let _enter = self.span.enter();
        debug!(host = %info.host, "DNS lookup started");
    }

    fn dns_done(&mut self, info: &DnsDoneInfo) {
        let _enter = self.span.enter();
        match &info.err {
            None => debug!(
                addrs = ?info.addrs,
                coalesced = info.coalesced,
                "DNS lookup done"
            ),
            Some(err) => debug!(error = %err, coalesced = info.coalesced, "DNS lookup failed"),
        }
    }

    fn connect_start(&mut self, network: &str, addr: &str) {
        self.span.record("network.peer.address", addr);
        let _enter = self.span.enter();
        debug!(network, addr, "Dial started");
    }

    fn connect_done(&mut self, network: &str, addr: &str, err: Option<&TraceError>) {
        let _enter = self.span.enter();
        match err {
            None => debug!(network, addr, "Dial done"),
            Some(err) => debug!(network, addr, error = %err, "Dial failed"),
        }
    }

    fn tls_handshake_start(&mut self) {
        let _enter = self.span.enter();
        trace!("TLS handshake started");
    }

    fn tls_handshake_done(&mut self, state: &TlsConnectionState, err: Option<&TraceError>) {
        let _enter = self.span.enter();
        match err {
            None => debug!(
                version = state.version.as_deref().unwrap_or_default(),
                cipher_suite = state.cipher_suite.as_deref().unwrap_or_default(),
                negotiated_protocol = state.negotiated_protocol.as_deref().unwrap_or_default(),
                did_resume = state.did_resume,
                "TLS handshake done"
            ),
            Some(err) => debug!(error = %err, "TLS handshake failed"),
        }
    }

    fn wrote_header_field(&mut self, key: &str, values: &[String]) {
        let _enter = self.span.enter();
        trace!(key, values = values.len(), "Wrote header field");
    }

    fn wrote_headers(&mut self) {
        let _enter = self.span.enter();
        trace!("Wrote headers");
    }

    fn wait_100_continue(&mut self) {
        let _enter = self.span.enter();
        trace!("Waiting for 100 Continue");
    }

    fn wrote_request(&mut self, info: &WroteRequestInfo) {
        let _enter = self.span.enter();
        match &info.err {
            None => debug!("Wrote request"),
            Some(err) => debug!(error = %err, "Writing request failed"),
        }
    }
}
