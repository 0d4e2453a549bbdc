//! API route configuration.
//!
//! All endpoints live under the `/v1` prefix:
//! - POST /v1/jobs/run            - admit a single pipeline run
//! - POST /v1/jobs/run-bulk       - admit one run per job id
//! - GET  /v1/jobs/{id}/status    - run snapshot
//! - GET  /v1/jobs/{id}/logs      - live line-oriented log stream
//! - POST /v1/jobs/{id}/cancel    - idempotent cancellation
//! - GET  /v1/artifacts/{id}/{f}  - serve a discovered artifact
//! - POST /v1/queue/{operation}   - enqueue a named sub-operation
//! - GET  /v1/queue/{op}/{qid}    - queue position and status
//! - GET  /v1/health              - liveness (no auth)
//! - GET  /v1/diagnostics         - aggregated health snapshot

use actix_web::web;

use crate::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .service(handlers::runs::submit_run)
            .service(handlers::runs::submit_bulk)
            .service(handlers::runs::run_status)
            .service(handlers::runs::cancel_run)
            .service(handlers::logs::stream_logs)
            .service(handlers::artifacts::serve_artifact)
            .service(handlers::queue::enqueue_operation)
            .service(handlers::queue::queue_entry_status)
            .service(handlers::health::health)
            .service(handlers::diagnostics::diagnostics),
    );
}
