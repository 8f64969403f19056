//! Backend module: registry, dispatcher and health aggregation.

mod dispatcher;
mod health;
mod registry;

pub use dispatcher::{Dispatcher, REQUEST_ID_HEADER, USER_EMAIL_HEADER, USER_ID_HEADER};
pub use health::{AggregateHealth, GatewayStatus, HealthAggregator};
pub use registry::InMemoryServiceRegistry;
