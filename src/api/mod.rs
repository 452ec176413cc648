//! ThreatSentry HTTP API Module
//! REST API for IOC lookups, history and aggregate stats

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use handlers::AppState;
pub use middleware::spawn_maintenance;
pub use routes::create_router;
pub use types::*;
