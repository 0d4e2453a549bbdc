//! Server-wide middleware configuration helpers.
//!
//! Keeps the Actix application setup focused by providing reusable
//! constructors for the CORS and request-logging layers. Secret
//! authentication lives in `applyflow_api::middleware::auth`.

use actix_cors::Cors;
use actix_web::middleware;
use log::debug;

use crate::config::OrchestratorConfig;

/// Build CORS middleware from server configuration using actix-cors.
pub fn build_cors_from_config(config: &OrchestratorConfig) -> Cors {
    let origins = &config.cors.allowed_origins;

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allow_any_header()
        .max_age(3600);

    if origins.is_empty() || origins.contains(&"*".to_string()) {
        cors = cors.allow_any_origin();
        debug!("CORS: Allowing any origin");
    } else {
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        debug!("CORS: Allowed origins: {:?}", origins);
    }

    cors
}

/// Build the request logger middleware.
pub fn request_logger() -> middleware::Logger {
    middleware::Logger::default()
}
