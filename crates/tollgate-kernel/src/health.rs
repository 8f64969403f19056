//! Health report types shared by the aggregator and the `/health` handler.

use serde::{Deserialize, Serialize};

/// Generic detail attached to every failed probe.  Raw transport errors are
/// logged, never returned.
pub const UNAVAILABLE_DETAIL: &str = "Service unavailable";

/// Outcome of one liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Ok,
    Error,
}

/// Result of probing one backend.  Built fresh on every probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(skip)]
    pub service_name: String,
    pub status: ProbeStatus,
    #[serde(rename = "latencyMs", skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(rename = "message", skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HealthReport {
    pub fn ok(service_name: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            service_name: service_name.into(),
            status: ProbeStatus::Ok,
            latency_ms: Some(latency_ms),
            detail: None,
        }
    }

    pub fn unavailable(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            status: ProbeStatus::Error,
            latency_ms: None,
            detail: Some(UNAVAILABLE_DETAIL.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }
}

/// Composite verdict across every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Degraded,
}

impl OverallHealth {
    /// `Healthy` iff every report is `ok`.
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a HealthReport>) -> Self {
        if reports.into_iter().all(HealthReport::is_ok) {
            OverallHealth::Healthy
        } else {
            OverallHealth::Degraded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_ok_and_error_shapes() {
        let ok = serde_json::to_value(HealthReport::ok("auth", 12)).unwrap();
        assert_eq!(ok, json!({ "status": "ok", "latencyMs": 12 }));

        let err = serde_json::to_value(HealthReport::unavailable("auth")).unwrap();
        assert_eq!(err, json!({ "status": "error", "message": "Service unavailable" }));
    }

    #[test]
    fn one_failure_degrades_overall() {
        let all_ok = [HealthReport::ok("a", 1), HealthReport::ok("b", 2)];
        assert_eq!(OverallHealth::from_reports(&all_ok), OverallHealth::Healthy);

        let mixed = [HealthReport::ok("a", 1), HealthReport::unavailable("b")];
        assert_eq!(OverallHealth::from_reports(&mixed), OverallHealth::Degraded);
    }
}
