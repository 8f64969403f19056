//! Prometheus metrics for the gateway.
//!
//! The registry is owned by [`GatewayMetrics`] rather than the process-wide
//! default registry, so several gateways (e.g. one per test) can coexist.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;


pub struct GatewayMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    upstream_duration: HistogramVec,
    rejections_total: IntCounterVec,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "tollgate_requests_total",
                "Requests answered by the gateway, by target service and status",
            ),
            &["service", "status"],
        )?;
        let upstream_duration = HistogramVec::new(
            HistogramOpts::new(
                "tollgate_upstream_duration_seconds",
                "Latency of forwarded calls to backend services",
            ),
            &["service"],
        )?;
        let rejections_total = IntCounterVec::new(
            Opts::new(
                "tollgate_rejections_total",
                "Requests the gateway refused or could not forward, by reason",
            ),
            &["reason"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(upstream_duration.clone()))?;
        registry.register(Box::new(rejections_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            upstream_duration,
            rejections_total,
        })
    }

    /// Count one answered request.
    pub fn record_request(&self, service: &str, status: u16) {
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[service, status.as_str()])
            .inc();
    }

    pub fn observe_upstream(&self, service: &str, elapsed: Duration) {
        self.upstream_duration
            .with_label_values(&[service])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_rejection(&self, reason: &str) {
        self.rejections_total.with_label_values(&[reason]).inc();
    }

    /// Content type of [`render`](Self::render) output.
    pub fn content_type(&self) -> String {
        format!("{}; charset=utf-8", TextEncoder::new().format_type())
    }

    /// Render every metric in the text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
