//! Run submission, status, and cancellation handlers.

use std::sync::Arc;

use actix_web::{post, get, web, HttpResponse, Responder};

use applyflow_commons::OrchestratorError;
use applyflow_core::AppContext;

use crate::models::{
    error_body, BulkRunItem, BulkRunRequest, BulkRunResponse, CancelResponse, RunRequest,
    RunResponse, StatusResponse,
};

use super::parse_run_id;

fn admission_error(err: OrchestratorError) -> HttpResponse {
    match err {
        OrchestratorError::InvalidInput(_) => HttpResponse::BadRequest().json(error_body(err.to_string())),
        OrchestratorError::NotFound(_) => HttpResponse::NotFound().json(error_body(err.to_string())),
        other => HttpResponse::InternalServerError().json(error_body(other.to_string())),
    }
}

/// POST /v1/jobs/run - admit a single pipeline run
#[post("/jobs/run")]
pub async fn submit_run(
    body: web::Json<RunRequest>,
    ctx: web::Data<Arc<AppContext>>,
) -> impl Responder {
    let (job_id, options) = body.into_inner().into_options();
    match ctx.admission().submit(&job_id, options) {
        Ok(run_id) => {
            let status = ctx
                .registry()
                .snapshot(&run_id)
                .map(|run| run.status)
                .unwrap_or(applyflow_commons::models::RunStatus::Queued);
            HttpResponse::Accepted().json(RunResponse::new(run_id, status))
        }
        Err(err) => admission_error(err),
    }
}

/// POST /v1/jobs/run-bulk - admit one run per job id
#[post("/jobs/run-bulk")]
pub async fn submit_bulk(
    body: web::Json<BulkRunRequest>,
    ctx: web::Data<Arc<AppContext>>,
) -> impl Responder {
    let (job_ids, options) = body.into_inner().into_options();
    let run_ids = match ctx.admission().submit_bulk(&job_ids, options) {
        Ok(run_ids) => run_ids,
        Err(err) => return admission_error(err),
    };

    let runs: Vec<BulkRunItem> = run_ids
        .into_iter()
        .filter_map(|run_id| {
            ctx.registry().snapshot(&run_id).map(|run| BulkRunItem {
                log_stream_url: format!("/v1/jobs/{}/logs", run_id),
                run_id,
                job_id: run.job_id,
                status: run.status,
            })
        })
        .collect();
    let total_count = runs.len();
    HttpResponse::Accepted().json(BulkRunResponse { runs, total_count })
}

/// GET /v1/jobs/{run_id}/status
#[get("/jobs/{run_id}/status")]
pub async fn run_status(
    path: web::Path<String>,
    ctx: web::Data<Arc<AppContext>>,
) -> impl Responder {
    let raw = path.into_inner();
    let run_id = match parse_run_id(&raw) {
        Ok(run_id) => run_id,
        Err(response) => return response,
    };
    match ctx.registry().snapshot(&run_id) {
        Some(run) => HttpResponse::Ok().json(StatusResponse::from(run)),
        None => HttpResponse::NotFound().json(error_body(format!("Run {} not found", raw))),
    }
}

/// POST /v1/jobs/{run_id}/cancel - idempotent external cancellation
#[post("/jobs/{run_id}/cancel")]
pub async fn cancel_run(
    path: web::Path<String>,
    ctx: web::Data<Arc<AppContext>>,
) -> impl Responder {
    let raw = path.into_inner();
    let run_id = match parse_run_id(&raw) {
        Ok(run_id) => run_id,
        Err(response) => return response,
    };
    match ctx.admission().cancel(&run_id) {
        Ok(status) => HttpResponse::Ok().json(CancelResponse { run_id, status }),
        Err(err) => admission_error(err),
    }
}
