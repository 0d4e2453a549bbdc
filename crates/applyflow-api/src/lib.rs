//! Applyflow HTTP API.
//!
//! Thin actix-web layer over the orchestration core: request/response
//! models, the shared-secret auth middleware, and the route handlers.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use middleware::auth::{AuthSettings, SecretAuth};
pub use routes::configure_routes;
