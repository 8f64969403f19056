//! Gateway router trait and route descriptor types.
//!
//! The [`GatewayRouter`] trait is the single kernel-level abstraction for
//! request classification.  Implementations (the route table in
//! `tollgate-gateway`) are loaded with [`RouteDescriptor`]s at startup and
//! consulted once per inbound request.

use super::error::GatewayError;
use super::types::{HttpMethod, RouteMatch};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Visibility / method pattern
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a route may be called without a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
        }
    }
}

/// Which methods a descriptor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodPattern {
    /// Every supported method.
    Any,
    /// Exactly one method.
    Only(HttpMethod),
}

impl MethodPattern {
    pub fn accepts(&self, method: &HttpMethod) -> bool {
        match self {
            MethodPattern::Any => true,
            MethodPattern::Only(m) => m == method,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MethodPattern::Any => "ANY",
            MethodPattern::Only(m) => m.as_str(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Path pattern
// ─────────────────────────────────────────────────────────────────────────────

/// Parsed form of a route path pattern.
///
/// ```text
/// /auth/login        exact path
/// /payments/*        `/payments/` followed by one or more segments
/// ```
///
/// Only a single trailing `*` segment is allowed; it captures the rest of the
/// path so sub-paths pass straight through to the target service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    /// Literal segments, in order, without slashes.
    pub segments: Vec<String>,
    /// `true` when the pattern ends with a `*` segment.
    pub wildcard: bool,
}

impl PathPattern {
    /// Parse a pattern such as `/users/*`.  The error string explains what is
    /// wrong with the pattern.
    pub fn parse(pattern: &str) -> Result<Self, String> {
        if !pattern.starts_with('/') {
            return Err("path pattern must start with '/'".to_string());
        }
        let trimmed = pattern.trim_matches('/');
        if trimmed.is_empty() {
            return Err("path pattern must contain at least one segment".to_string());
        }

        let parts: Vec<&str> = trimmed.split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());
        let mut wildcard = false;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err("path pattern contains an empty segment".to_string());
            }
            if part.contains('*') {
                if *part != "*" || i != last {
                    return Err("'*' is only allowed as the final segment".to_string());
                }
                if i == 0 {
                    return Err("a wildcard needs at least one literal segment before it".to_string());
                }
                wildcard = true;
            } else {
                segments.push((*part).to_string());
            }
        }
        Ok(Self { segments, wildcard })
    }

    /// Ordering key: more literal segments first, then exact before
    /// wildcard.  Higher sorts earlier.
    pub fn specificity(&self) -> (usize, bool) {
        (self.segments.len(), !self.wildcard)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Route descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// A single routing rule mapping a method + path pattern to a backend.
///
/// Visibility is carried per descriptor, not per service, so one backend can
/// expose both public and protected routes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Unique stable identifier for this route.
    pub id: String,
    /// Accepted methods.
    pub method: MethodPattern,
    /// Path pattern.  Must begin with `/`.
    pub path_pattern: String,
    /// Registry name of the backend this route forwards to.
    pub target_service: String,
    /// Public routes skip authentication.
    pub visibility: Visibility,
}

impl RouteDescriptor {
    /// Create a protected, any-method route.
    pub fn new(
        id: impl Into<String>,
        path_pattern: impl Into<String>,
        target_service: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            method: MethodPattern::Any,
            path_pattern: path_pattern.into(),
            target_service: target_service.into(),
            visibility: Visibility::Protected,
        }
    }

    /// Builder: restrict to a single HTTP method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = MethodPattern::Only(method);
        self
    }

    /// Builder: mark the route public.
    pub fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }

    /// Parse the path pattern, mapping parse failures to a route error.
    pub fn parsed_pattern(&self) -> Result<PathPattern, GatewayError> {
        PathPattern::parse(&self.path_pattern)
            .map_err(|reason| GatewayError::InvalidPathPattern(self.id.clone(), reason))
    }

    /// Basic sanity checks run during [`GatewayConfig::validate()`](crate::GatewayConfig::validate).
    pub(crate) fn validate(&self) -> Result<(), GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyRouteId);
        }
        self.parsed_pattern().map(|_| ())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router trait
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for request classification.
///
/// The trait is synchronous: classification is a pure in-memory lookup with
/// no I/O on the hot path.
pub trait GatewayRouter: Send + Sync {
    /// Register a route.  Returns [`GatewayError::DuplicateRoute`] for a
    /// repeated id and [`GatewayError::AmbiguousRoute`] when an existing route
    /// has the same method and path pattern.
    fn register(&mut self, route: RouteDescriptor) -> Result<(), GatewayError>;

    /// Classify `(method, path)` to the most specific matching route, or
    /// `None` when nothing matches.
    fn classify(&self, method: &HttpMethod, path: &str) -> Option<RouteMatch>;

    /// Registered routes, most specific first.
    fn routes(&self) -> Vec<&RouteDescriptor>;
}
