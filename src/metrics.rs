use std::net::SocketAddr;
use std::time::Duration;

use prometheus::{CounterVec, Encoder, HistogramVec, IntCounter, Registry, TextEncoder, histogram_opts, opts};

/// Process-wide, concurrency-safe Prometheus collectors. Every `&self`
/// method takes a shared reference: `CounterVec`/`HistogramVec` clones are
/// cheap handles onto shared atomics, so one `Metrics` is built once at
/// startup and handed to every listener and query FSM behind an `Arc`.
pub struct Metrics {
    registry: Registry,

    query_fsm_successes: CounterVec,
    query_fsm_failures: CounterVec,
    query_fsm_latency: HistogramVec,

    spartan_ignored_questions: IntCounter,
    spartan_no_upstreams_available: IntCounter,
    spartan_upstreams_failed: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let query_fsm_successes = CounterVec::new(
            opts!(
                "query_fsm_successes_total",
                "Successful probe replies recorded per upstream"
            ),
            &["upstream"],
        )?;

        let query_fsm_failures = CounterVec::new(
            opts!(
                "query_fsm_failures_total",
                "Probe failures or timeouts recorded per upstream"
            ),
            &["upstream"],
        )?;

        let query_fsm_latency = HistogramVec::new(
            histogram_opts!(
                "query_fsm_latency_microseconds",
                "Microseconds between probe spawn and reply receipt"
            ),
            &["upstream"],
        )?;

        let spartan_ignored_questions = IntCounter::with_opts(opts!(
            "spartan_ignored_questions_total",
            "Extra questions dropped from multi-question requests"
        ))?;

        let spartan_no_upstreams_available = IntCounter::with_opts(opts!(
            "spartan_no_upstreams_available_total",
            "Queries for which the router returned no upstreams"
        ))?;

        let spartan_upstreams_failed = IntCounter::with_opts(opts!(
            "spartan_upstreams_failed_total",
            "Queries for which every spawned probe failed or timed out"
        ))?;

        registry.register(Box::new(query_fsm_successes.clone()))?;
        registry.register(Box::new(query_fsm_failures.clone()))?;
        registry.register(Box::new(query_fsm_latency.clone()))?;
        registry.register(Box::new(spartan_ignored_questions.clone()))?;
        registry.register(Box::new(spartan_no_upstreams_available.clone()))?;
        registry.register(Box::new(spartan_upstreams_failed.clone()))?;

        Ok(Self {
            registry,
            query_fsm_successes,
            query_fsm_failures,
            query_fsm_latency,
            spartan_ignored_questions,
            spartan_no_upstreams_available,
            spartan_upstreams_failed,
        })
    }

    pub fn record_success(&self, upstream: SocketAddr, latency: Duration) {
        let label = upstream.to_string();
        self.query_fsm_successes.with_label_values(&[&label]).inc();
        self.query_fsm_latency
            .with_label_values(&[&label])
            .observe(latency.as_micros() as f64);
    }

    pub fn record_failure(&self, upstream: SocketAddr) {
        self.query_fsm_failures
            .with_label_values(&[&upstream.to_string()])
            .inc();
    }

    pub fn record_ignored_questions(&self, count: usize) {
        if count > 0 {
            self.spartan_ignored_questions.inc_by(count as u64);
        }
    }

    pub fn record_no_upstreams_available(&self) {
        self.spartan_no_upstreams_available.inc();
    }

    pub fn record_upstreams_failed(&self) {
        self.spartan_upstreams_failed.inc();
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
