//! Specificity-ordered route table implementing [`GatewayRouter`].
//!
//! Routes are kept sorted most-specific first, so classification is a linear
//! scan that stops at the first hit.  Specificity is, in order: number of
//! literal segments, exact before trailing wildcard, single method before
//! `ANY`.  With that ordering `/auth/login` always wins over `/auth/*`.
//!
//! The scan is O(R × D) (routes × path depth), which is fine for a table of a
//! dozen entries and trivially correct to verify.

use tollgate_kernel::{
    GatewayError, GatewayRouter, HttpMethod, MethodPattern, PathPattern, RouteDescriptor,
    RouteMatch,
};

struct CompiledRoute {
    descriptor: RouteDescriptor,
    pattern: PathPattern,
}

impl CompiledRoute {
    fn rank(&self) -> (usize, bool, bool) {
        let (literals, exact) = self.pattern.specificity();
        let single_method = matches!(self.descriptor.method, MethodPattern::Only(_));
        (literals, exact, single_method)
    }
}

/// [`GatewayRouter`] implementation with most-specific-first matching.
#[derive(Default)]
pub struct RouteTable {
    /// Routes sorted by descending rank.
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a list of descriptors.
    pub fn from_routes(
        routes: impl IntoIterator<Item = RouteDescriptor>,
    ) -> Result<Self, GatewayError> {
        let mut table = Self::new();
        for route in routes {
            table.register(route)?;
        }
        Ok(table)
    }

    /// `true` when some route's pattern matches `path`, whatever its method.
    ///
    /// Separates "unknown path" (404) from "known path, unsupported method"
    /// (405).
    pub fn matches_path(&self, path: &str) -> bool {
        self.routes
            .iter()
            .any(|r| Self::match_path(&r.pattern, path).is_some())
    }

    /// Match a concrete path against a parsed pattern.
    ///
    /// Returns `Some(captured)` on a match, where `captured` is the remainder
    /// behind a trailing wildcard.  A wildcard needs at least one segment.
    fn match_path(pattern: &PathPattern, path: &str) -> Option<Option<String>> {
        let p_parts: Vec<&str> = path.trim_matches('/').split('/').collect();
        let literals = pattern.segments.len();

        if pattern.wildcard {
            if p_parts.len() <= literals {
                return None;
            }
        } else if p_parts.len() != literals {
            return None;
        }

        if pattern
            .segments
            .iter()
            .zip(p_parts.iter())
            .any(|(t, p)| t != p)
        {
            return None;
        }

        if pattern.wildcard {
            Some(Some(p_parts[literals..].join("/")))
        } else {
            Some(None)
        }
    }
}

impl GatewayRouter for RouteTable {
    fn register(&mut self, route: RouteDescriptor) -> Result<(), GatewayError> {
        route_is_named(&route)?;
        if self.routes.iter().any(|r| r.descriptor.id == route.id) {
            return Err(GatewayError::DuplicateRoute(route.id));
        }
        let pattern = route.parsed_pattern()?;
        if let Some(existing) = self
            .routes
            .iter()
            .find(|r| r.pattern == pattern && r.descriptor.method == route.method)
        {
            return Err(GatewayError::AmbiguousRoute(
                route.id,
                existing.descriptor.id.clone(),
            ));
        }

        let compiled = CompiledRoute {
            descriptor: route,
            pattern,
        };
        // Insert maintaining descending rank order.
        let rank = compiled.rank();
        let pos = self.routes.partition_point(|r| r.rank() >= rank);
        self.routes.insert(pos, compiled);
        Ok(())
    }

    fn classify(&self, method: &HttpMethod, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            if !route.descriptor.method.accepts(method) {
                return None;
            }
            Self::match_path(&route.pattern, path).map(|captured| RouteMatch {
                route_id: route.descriptor.id.clone(),
                target_service: route.descriptor.target_service.clone(),
                visibility: route.descriptor.visibility,
                captured,
            })
        })
    }

    fn routes(&self) -> Vec<&RouteDescriptor> {
        self.routes.iter().map(|r| &r.descriptor).collect()
    }
}

fn route_is_named(route: &RouteDescriptor) -> Result<(), GatewayError> {
    if route.id.trim().is_empty() {
        return Err(GatewayError::EmptyRouteId);
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
