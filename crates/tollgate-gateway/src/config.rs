//! Environment-driven gateway settings.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PORT` | `3000` | TCP port to listen on. |
//! | `AUTH_SERVICE_URL` | `http://localhost:3001` | Identity backend base URL. |
//! | `PAYMENTS_SERVICE_URL` | `http://localhost:3002` | Payments backend base URL. |
//! | `NOTIFICATIONS_SERVICE_URL` | `http://localhost:3003` | Notifications backend base URL. |
//! | `JWT_SECRET` | `your_super_secret_jwt_key` | HMAC secret for bearer tokens. |
//! | `RATE_LIMIT_TTL` | `60` | Rate window length in seconds. |
//! | `RATE_LIMIT_MAX` | `100` | Requests allowed per window and client. |
//! | `SERVICE_TIMEOUT_MS` | `10000` | Per-call timeout for forwarded requests. |
//! | `HEALTH_TIMEOUT_MS` | `3000` | Per-probe timeout for `GET /health`. |
//! | `LOG_FORMAT` | `text` | `text` or `json`. |

use crate::router::{AUTH_SERVICE, NOTIFICATIONS_SERVICE, PAYMENTS_SERVICE, default_routes};
use std::str::FromStr;
use tollgate_kernel::{GatewayConfig, RateLimitConfig, ServiceRegistryEntry};
use tracing::warn;

/// Secret used when `JWT_SECRET` is not set.  Only fit for local development.
pub const DEFAULT_JWT_SECRET: &str = "your_super_secret_jwt_key";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT` from the process environment.
    ///
    /// Kept separate from [`GatewaySettings`] because the subscriber has to
    /// exist before settings parsing can report anything.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Runtime settings of the gateway process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub port: u16,
    pub auth_service_url: String,
    pub payments_service_url: String,
    pub notifications_service_url: String,
    pub jwt_secret: String,
    pub rate_limit_ttl_secs: u64,
    pub rate_limit_max: u64,
    pub service_timeout_ms: u64,
    pub health_timeout_ms: u64,
    pub log_format: LogFormat,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            port: 3000,
            auth_service_url: "http://localhost:3001".to_string(),
            payments_service_url: "http://localhost:3002".to_string(),
            notifications_service_url: "http://localhost:3003".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            rate_limit_ttl_secs: 60,
            rate_limit_max: 100,
            service_timeout_ms: 10_000,
            health_timeout_ms: 3_000,
            log_format: LogFormat::Text,
        }
    }
}

impl GatewaySettings {
    /// Load settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Empty values count as unset.  Numbers that do not parse fall back to
    /// the default and log a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            port: parse_or(&get, "PORT", defaults.port),
            auth_service_url: get("AUTH_SERVICE_URL").unwrap_or(defaults.auth_service_url),
            payments_service_url: get("PAYMENTS_SERVICE_URL")
                .unwrap_or(defaults.payments_service_url),
            notifications_service_url: get("NOTIFICATIONS_SERVICE_URL")
                .unwrap_or(defaults.notifications_service_url),
            jwt_secret: get("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            rate_limit_ttl_secs: parse_or(&get, "RATE_LIMIT_TTL", defaults.rate_limit_ttl_secs),
            rate_limit_max: parse_or(&get, "RATE_LIMIT_MAX", defaults.rate_limit_max),
            service_timeout_ms: parse_or(&get, "SERVICE_TIMEOUT_MS", defaults.service_timeout_ms),
            health_timeout_ms: parse_or(&get, "HEALTH_TIMEOUT_MS", defaults.health_timeout_ms),
            log_format: LogFormat::parse(get("LOG_FORMAT").as_deref()),
        }
    }

    /// `true` when no secret was configured.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Build the validated-later gateway configuration: the built-in route
    /// table plus one registry entry per backend.
    pub fn to_gateway_config(&self) -> GatewayConfig {
        let services = [
            (AUTH_SERVICE, &self.auth_service_url),
            (PAYMENTS_SERVICE, &self.payments_service_url),
            (NOTIFICATIONS_SERVICE, &self.notifications_service_url),
        ];

        let mut config = GatewayConfig::new(self.jwt_secret.clone())
            .with_health_timeout_ms(self.health_timeout_ms)
            .with_rate_limit(RateLimitConfig::new(
                self.rate_limit_ttl_secs,
                self.rate_limit_max,
            ));
        for (name, url) in services {
            config = config.with_service(ServiceRegistryEntry::new(
                name,
                url.as_str(),
                self.service_timeout_ms,
            ));
        }
        for route in default_routes() {
            config = config.with_route(route);
        }
        config
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(key, value = %raw, default = %default, "ignoring unparseable setting");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> GatewaySettings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewaySettings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]);
        assert_eq!(s, GatewaySettings::default());
        assert!(s.uses_default_secret());
        assert_eq!(s.port, 3000);
        assert_eq!(s.rate_limit_ttl_secs, 60);
        assert_eq!(s.rate_limit_max, 100);
    }

    #[test]
    fn values_override_defaults() {
        let s = settings(&[
            ("PORT", "8080"),
            ("PAYMENTS_SERVICE_URL", "http://payments:4000"),
            ("JWT_SECRET", "s3cret"),
            ("RATE_LIMIT_MAX", "5"),
            ("LOG_FORMAT", "JSON"),
        ]);
        assert_eq!(s.port, 8080);
        assert_eq!(s.payments_service_url, "http://payments:4000");
        assert!(!s.uses_default_secret());
        assert_eq!(s.rate_limit_max, 5);
        assert_eq!(s.log_format, LogFormat::Json);
    }

    #[test]
    fn unparseable_or_empty_values_fall_back() {
        let s = settings(&[("PORT", "eighty"), ("RATE_LIMIT_TTL", "-1"), ("JWT_SECRET", "  ")]);
        assert_eq!(s.port, 3000);
        assert_eq!(s.rate_limit_ttl_secs, 60);
        assert!(s.uses_default_secret());
    }

    #[test]
    fn gateway_config_is_valid_and_complete() {
        let config = settings(&[("SERVICE_TIMEOUT_MS", "2500")]).to_gateway_config();
        config.validate().unwrap();

        let names: Vec<_> = config.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["auth", "payments", "notifications"]);
        assert!(config.services.iter().all(|s| s.call_timeout_ms == 2500));
        assert_eq!(config.rate_limit, RateLimitConfig::new(60, 100));
        assert_eq!(config.routes.len(), default_routes().len());
    }

    #[test]
    fn zero_rate_limit_is_caught_by_validation() {
        let config = settings(&[("RATE_LIMIT_MAX", "0")]).to_gateway_config();
        assert!(config.validate().is_err());
    }
}
