//! Read-only view of an outbound request, as seen by connection tracers.

use std::sync::OnceLock;

use http::{HeaderMap, Method, Uri, Version, header};
use opentelemetry::Context;

/// The request a tracer is attached to.
///
/// Everything is fixed at construction except the remote address, which is
/// filled in once by the first dial that reports a target.
#[derive(Debug)]
pub struct TracedRequest {
    method: Method,
    uri: Uri,
    version: Version,
    host: Option<String>,
    context: Context,
    remote_addr: OnceLock<String>,
}

impl TracedRequest {
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            host: None,
            context: Context::current(),
            remote_addr: OnceLock::new(),
        }
    }

    /// Capture method, URI, version and `Host` header from an `http::Request`.
    /// The emission context is the one current at the time of the call.
    #[must_use]
    pub fn from_http<B>(request: &http::Request<B>) -> Self {
        Self::new(request.method().clone(), request.uri().clone())
            .with_version(request.version())
            .with_headers(request.headers())
    }

    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Host to fall back on when the URI carries none, as for an origin-form
    /// URI sent with a `Host` header. A host in the URI always takes precedence.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    fn with_headers(mut self, headers: &HeaderMap) -> Self {
        if let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
            self.host = Some(host.to_string());
        }
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// The `Host` override, if any.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Context every metric update for this request is emitted under.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Address of the first dial target, once known.
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.get().map(String::as_str)
    }

    /// Record `addr` as the remote address unless one is already set.
    /// Returns whether this call set it.
    pub fn set_remote_addr_if_empty(&self, addr: &str) -> bool {
        if addr.is_empty() {
            return false;
        }
        self.remote_addr.set(addr.to_string()).is_ok()
    }
}
