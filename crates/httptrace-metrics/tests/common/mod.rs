#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use http::{HeaderMap, Method, StatusCode, Uri};
use httptrace_metrics::{
    BoxError, ClientMetrics, ClientTrace, Clock, DnsDoneInfo, DnsStartInfo, Float64Histogram,
    GotConnInfo, Int64UpDownCounter, TlsConnectionState, TraceError, TracedRequest,
    WroteRequestInfo,
};
use opentelemetry::{Context, KeyValue};

pub const STATE_KEY: &str = "http.connection.state";

fn attribute(attributes: &[KeyValue], key: &str) -> Option<String> {
    attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str().into_owned())
}

/// Up/down counter that remembers every update.
#[derive(Default)]
pub struct RecordingCounter {
    pub updates: Mutex<Vec<(i64, Vec<KeyValue>)>>,
}

impl Int64UpDownCounter for RecordingCounter {
    fn add(&self, _cx: &Context, delta: i64, attributes: &[KeyValue]) {
        self.updates
            .lock()
            .unwrap()
            .push((delta, attributes.to_vec()));
    }
}

impl RecordingCounter {
    /// Deltas for `state`, in order.
    pub fn deltas(&self, state: &str) -> Vec<i64> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, attrs)| attribute(attrs, STATE_KEY).as_deref() == Some(state))
            .map(|(delta, _)| *delta)
            .collect()
    }

    /// Net value for `state`.
    pub fn sum(&self, state: &str) -> i64 {
        self.deltas(state).iter().sum()
    }

    /// Net value for `state` restricted to one `server.address`.
    pub fn sum_for_host(&self, state: &str, host: &str) -> i64 {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, attrs)| {
                attribute(attrs, STATE_KEY).as_deref() == Some(state)
                    && attribute(attrs, "server.address").as_deref() == Some(host)
            })
            .map(|(delta, _)| *delta)
            .sum()
    }

    /// Net value per distinct label set for `state`.
    pub fn series(&self, state: &str) -> Vec<(Vec<KeyValue>, i64)> {
        let mut series: Vec<(Vec<KeyValue>, i64)> = Vec::new();
        for (delta, attrs) in self.updates.lock().unwrap().iter() {
            if attribute(attrs, STATE_KEY).as_deref() != Some(state) {
                continue;
            }
            match series.iter_mut().find(|(labels, _)| *labels == *attrs) {
                Some((_, value)) => *value += delta,
                None => series.push((attrs.clone(), *delta)),
            }
        }
        series
    }

    pub fn len(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.updates.lock().unwrap().clear();
    }
}

/// Histogram that remembers every observation.
#[derive(Default)]
pub struct RecordingHistogram {
    pub records: Mutex<Vec<(f64, Vec<KeyValue>)>>,
}

impl Float64Histogram for RecordingHistogram {
    fn record(&self, _cx: &Context, value: f64, attributes: &[KeyValue]) {
        self.records
            .lock()
            .unwrap()
            .push((value, attributes.to_vec()));
    }
}

impl RecordingHistogram {
    pub fn values(&self) -> Vec<f64> {
        self.records.lock().unwrap().iter().map(|(v, _)| *v).collect()
    }

    pub fn values_for_host(&self, host: &str) -> Vec<f64> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, attrs)| attribute(attrs, "server.address").as_deref() == Some(host))
            .map(|(v, _)| *v)
            .collect()
    }

    pub fn attributes(&self) -> Vec<Vec<KeyValue>> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(_, a)| a.clone())
            .collect()
    }
}

pub struct Instruments {
    pub counter: Arc<RecordingCounter>,
    pub histogram: Arc<RecordingHistogram>,
    pub metrics: Arc<ClientMetrics>,
}

pub fn instruments() -> Instruments {
    let counter = Arc::new(RecordingCounter::default());
    let histogram = Arc::new(RecordingHistogram::default());
    let metrics = Arc::new(ClientMetrics::with_instruments(
        Some(counter.clone()),
        Some(histogram.clone()),
    ));
    Instruments {
        counter,
        histogram,
        metrics,
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}

pub fn request(uri: &'static str) -> Arc<TracedRequest> {
    Arc::new(TracedRequest::new(Method::GET, Uri::from_static(uri)))
}

#[derive(Debug)]
pub struct TestError(pub &'static str);

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for TestError {}

/// One observed hook with its arguments, errors rendered as strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    GetConn(String),
    GotConn(GotConnInfo),
    PutIdleConn(Option<String>),
    GotFirstResponseByte,
    Got100Continue,
    Got1xxResponse(u16, HeaderMap),
    DnsStart(DnsStartInfo),
    DnsDone(Vec<std::net::IpAddr>, Option<String>, bool),
    ConnectStart(String, String),
    ConnectDone(String, String, Option<String>),
    TlsHandshakeStart,
    TlsHandshakeDone(TlsConnectionState, Option<String>),
    WroteHeaderField(String, Vec<String>),
    WroteHeaders,
    Wait100Continue,
    WroteRequest(Option<String>),
}

/// Delegate that records every hook it receives.
#[derive(Clone, Default)]
pub struct SpyTrace {
    pub events: Arc<Mutex<Vec<Event>>>,
    /// Error handed back from `got_1xx_response`.
    pub reject_1xx: Option<&'static str>,
    /// Counter snapshot taken as each event arrives, to check ordering.
    pub observe: Option<Arc<RecordingCounter>>,
    pub seen_counter_len: Arc<Mutex<Vec<usize>>>,
}

impl SpyTrace {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        if let Some(counter) = &self.observe {
            self.seen_counter_len.lock().unwrap().push(counter.len());
        }
        self.events.lock().unwrap().push(event);
    }
}

fn render(err: Option<&TraceError>) -> Option<String> {
    err.map(|e| e.to_string())
}

impl ClientTrace for SpyTrace {
    fn get_conn(&mut self, host_port: &str) {
        self.push(Event::GetConn(host_port.to_string()));
    }

    fn got_conn(&mut self, info: &GotConnInfo) {
        self.push(Event::GotConn(info.clone()));
    }

    fn put_idle_conn(&mut self, err: Option<&TraceError>) {
        self.push(Event::PutIdleConn(render(err)));
    }

    fn got_first_response_byte(&mut self) {
        self.push(Event::GotFirstResponseByte);
    }

    fn got_100_continue(&mut self) {
        self.push(Event::Got100Continue);
    }

    fn got_1xx_response(&mut self, code: StatusCode, header: &HeaderMap) -> Result<(), BoxError> {
        self.push(Event::Got1xxResponse(code.as_u16(), header.clone()));
        match self.reject_1xx {
            Some(msg) => Err(Box::new(TestError(msg))),
            None => Ok(()),
        }
    }

    fn dns_start(&mut self, info: &DnsStartInfo) {
        self.push(Event::DnsStart(info.clone()));
    }

    fn dns_done(&mut self, info: &DnsDoneInfo) {
        self.push(Event::DnsDone(
            info.addrs.clone(),
            info.err.as_ref().map(|e| e.to_string()),
            info.coalesced,
        ));
    }

    fn connect_start(&mut self, network: &str, addr: &str) {
        self.push(Event::ConnectStart(network.to_string(), addr.to_string()));
    }

    fn connect_done(&mut self, network: &str, addr: &str, err: Option<&TraceError>) {
        self.push(Event::ConnectDone(
            network.to_string(),
            addr.to_string(),
            render(err),
        ));
    }

    fn tls_handshake_start(&mut self) {
        self.push(Event::TlsHandshakeStart);
    }

    fn tls_handshake_done(&mut self, state: &TlsConnectionState, err: Option<&TraceError>) {
        self.push(Event::TlsHandshakeDone(state.clone(), render(err)));
    }

    fn wrote_header_field(&mut self, key: &str, values: &[String]) {
        self.push(Event::WroteHeaderField(key.to_string(), values.to_vec()));
    }

    fn wrote_headers(&mut self) {
        self.push(Event::WroteHeaders);
    }

    fn wait_100_continue(&mut self) {
        self.push(Event::Wait100Continue);
    }

    fn wrote_request(&mut self, info: &WroteRequestInfo) {
        self.push(Event::WroteRequest(info.err.as_ref().map(|e| e.to_string())));
    }
}
