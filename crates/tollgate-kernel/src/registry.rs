//! Backend service registry: kernel contract.
//!
//! The [`ServiceRegistry`] trait maps a backend name (as named by a
//! [`RouteDescriptor`](crate::RouteDescriptor)) to the base URL and call
//! timeout the dispatcher and health aggregator use.  The in-memory
//! implementation lives in `tollgate-gateway`.

use super::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default path probed by the health aggregator.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// One backend known to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceRegistryEntry {
    /// Unique name routes refer to (e.g. `payments`).
    pub name: String,
    /// Base URL without a trailing slash (e.g. `http://payments:3002`).
    pub base_url: String,
    /// Upper bound on a single forwarded call, in milliseconds.
    pub call_timeout_ms: u64,
    /// Path appended to `base_url` for liveness probes.
    pub health_path: String,
}

impl ServiceRegistryEntry {
    /// Construct an entry with the default health path.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, call_timeout_ms: u64) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            call_timeout_ms,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }

    /// Builder: override the liveness probe path.
    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// `base_url + path`.  `path` is expected to start with `/`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Basic sanity checks run during [`GatewayConfig::validate()`](crate::GatewayConfig::validate).
    pub(crate) fn validate(&self) -> Result<(), GatewayError> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::EmptyServiceName);
        }
        if self.base_url.trim().is_empty() {
            return Err(GatewayError::InvalidBaseUrl(
                self.name.clone(),
                "base URL cannot be empty".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(GatewayError::InvalidBaseUrl(
                self.name.clone(),
                format!("base URL '{}' must start with http:// or https://", self.base_url),
            ));
        }
        if self.call_timeout_ms == 0 {
            return Err(GatewayError::InvalidTimeout(self.name.clone()));
        }
        Ok(())
    }
}

/// Kernel contract for the backend service registry.
///
/// Lookups are by exact name and must be O(1).
pub trait ServiceRegistry: Send + Sync {
    /// Register a backend.  Returns [`GatewayError::DuplicateService`] if the
    /// name is already taken.
    fn register(&mut self, entry: ServiceRegistryEntry) -> Result<(), GatewayError>;

    /// Look up a backend by name.
    fn lookup(&self, name: &str) -> Option<&ServiceRegistryEntry>;

    /// All registered backends, sorted by name.
    fn list_all(&self) -> Vec<&ServiceRegistryEntry>;
}
