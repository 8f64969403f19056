//! Route table and the gateway's built-in routing rules.

mod table;

pub use table::RouteTable;

use tollgate_kernel::RouteDescriptor;

/// Registry name of the identity backend.
pub const AUTH_SERVICE: &str = "auth";
/// Registry name of the payments backend.
pub const PAYMENTS_SERVICE: &str = "payments";
/// Registry name of the notifications backend.
pub const NOTIFICATIONS_SERVICE: &str = "notifications";

/// The routing rules the gateway ships with.
///
/// | Pattern | Backend | Visibility |
/// |---------|---------|------------|
/// | `/auth/register`, `/auth/login` | `auth` | public |
/// | `/auth/*`, `/users`, `/users/*` | `auth` | protected |
/// | `/payments`, `/payments/*` | `payments` | protected |
/// | `/notifications`, `/notifications/*` | `notifications` | protected |
///
/// `GET /health` and `GET /metrics` are served by the gateway itself and are
/// not part of this table.
pub fn default_routes() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("auth-register", "/auth/register", AUTH_SERVICE).public(),
        RouteDescriptor::new("auth-login", "/auth/login", AUTH_SERVICE).public(),
        RouteDescriptor::new("auth-family", "/auth/*", AUTH_SERVICE),
        RouteDescriptor::new("users-root", "/users", AUTH_SERVICE),
        RouteDescriptor::new("users-family", "/users/*", AUTH_SERVICE),
        RouteDescriptor::new("payments-root", "/payments", PAYMENTS_SERVICE),
        RouteDescriptor::new("payments-family", "/payments/*", PAYMENTS_SERVICE),
        RouteDescriptor::new("notifications-root", "/notifications", NOTIFICATIONS_SERVICE),
        RouteDescriptor::new(
            "notifications-family",
            "/notifications/*",
            NOTIFICATIONS_SERVICE,
        ),
    ]
}
