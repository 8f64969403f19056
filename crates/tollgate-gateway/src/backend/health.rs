//! Composite health across every registered backend.
//!
//! Probes run concurrently, each under its own timeout, and are joined only
//! once all of them have settled: a refused or slow backend turns into an
//! `error` report for that backend and never delays or aborts the others.

use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tollgate_kernel::{HealthReport, OverallHealth, ServiceRegistry, ServiceRegistryEntry};
use tracing::{debug, warn};

/// The gateway's own status block.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub status: &'static str,
    pub timestamp: String,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateHealth {
    pub gateway: GatewayStatus,
    pub services: BTreeMap<String, HealthReport>,
    pub overall: OverallHealth,
}

/// Fans out liveness probes to every backend in the registry.
pub struct HealthAggregator {
    client: Client,
    registry: Arc<dyn ServiceRegistry>,
    probe_timeout: Duration,
}

impl HealthAggregator {
    pub fn new(client: Client, registry: Arc<dyn ServiceRegistry>, probe_timeout: Duration) -> Self {
        Self {
            client,
            registry,
            probe_timeout,
        }
    }

    /// Probe every backend and merge the results.  Never fails.
    pub async fn aggregate(&self) -> AggregateHealth {
        let probes = self
            .registry
            .list_all()
            .into_iter()
            .map(|entry| self.probe(entry));
        let reports = join_all(probes).await;

        let overall = OverallHealth::from_reports(&reports);
        let services = reports
            .into_iter()
            .map(|r| (r.service_name.clone(), r))
            .collect();

        AggregateHealth {
            gateway: GatewayStatus {
                status: "ok",
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
            services,
            overall,
        }
    }

    /// Probe one backend.  Any 2xx within the timeout is healthy.
    async fn probe(&self, entry: &ServiceRegistryEntry) -> HealthReport {
        let url = entry.url_for(&entry.health_path);
        let start = Instant::now();

        let outcome = tokio::time::timeout(self.probe_timeout, self.client.get(&url).send()).await;
        let failure = match outcome {
            Ok(Ok(resp)) if resp.status().is_success() => {
                let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                debug!(service = %entry.name, latency_ms, "health probe ok");
                return HealthReport::ok(&entry.name, latency_ms);
            }
            Ok(Ok(resp)) => format!("unhealthy status {}", resp.status()),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no answer within {}ms", self.probe_timeout.as_millis()),
        };

        warn!(service = %entry.name, url = %url, reason = %failure, "health probe failed");
        HealthReport::unavailable(&entry.name)
    }
}
