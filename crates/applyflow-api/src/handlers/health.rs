//! Health endpoint.
//!
//! Unauthenticated liveness signal for load balancers and the CRUD UI.
//! When a PDF render service is configured, its reachability is checked
//! with a short TCP connect so the UI can grey out PDF actions.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;

use applyflow_core::diagnostics::DependencyProbe;
use applyflow_core::diagnostics::TcpProbe;
use applyflow_core::AppContext;

use crate::models::HealthResponse;

const PDF_PROBE_TIMEOUT: Duration = Duration::from_millis(400);

/// Optional health-check extras wired in by the server.
#[derive(Debug, Clone, Default)]
pub struct HealthOptions {
    /// host:port of the PDF render service, when one is configured
    pub pdf_service_addr: Option<String>,
}

/// GET /v1/health
#[get("/health")]
pub async fn health(
    ctx: web::Data<Arc<AppContext>>,
    options: web::Data<HealthOptions>,
) -> impl Responder {
    let pdf_service_status = match &options.pdf_service_addr {
        Some(addr) => {
            let probe = TcpProbe::new("pdf_service", addr.clone());
            let status =
                match tokio::time::timeout(PDF_PROBE_TIMEOUT, probe.probe()).await {
                    Ok(Ok(())) => "ok",
                    Ok(Err(_)) => "unreachable",
                    Err(_) => "timeout",
                };
            Some(status.to_string())
        }
        None => None,
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        active_runs: ctx.registry().running_count(),
        max_concurrency: ctx.admission().max_concurrency(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        pdf_service_status,
    })
}
