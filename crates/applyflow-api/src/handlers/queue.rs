//! Queue-operation handlers.

use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse, Responder};

use applyflow_commons::models::QueueOperation;
use applyflow_commons::{OrchestratorError, QueueId};
use applyflow_core::AppContext;

use crate::models::{error_body, QueueEntryResponse, QueueRequest, QueueResponse};

fn parse_operation(raw: &str) -> Result<QueueOperation, HttpResponse> {
    QueueOperation::from_path_segment(raw).ok_or_else(|| {
        HttpResponse::NotFound().json(error_body(format!("Unknown operation '{}'", raw)))
    })
}

/// POST /v1/queue/{operation} - enqueue a named sub-operation
#[post("/queue/{operation}")]
pub async fn enqueue_operation(
    path: web::Path<String>,
    body: web::Json<QueueRequest>,
    ctx: web::Data<Arc<AppContext>>,
) -> impl Responder {
    let operation = match parse_operation(&path.into_inner()) {
        Ok(op) => op,
        Err(response) => return response,
    };
    let (job_id, options) = body.into_inner().into_options();
    match ctx.admission().queue_operation(&job_id, operation, options) {
        Ok((queue_id, position)) => {
            let estimated_wait_seconds = ctx.admission().estimated_wait(&queue_id).unwrap_or(0);
            HttpResponse::Accepted().json(QueueResponse {
                queue_id,
                position,
                estimated_wait_seconds,
            })
        }
        Err(OrchestratorError::InvalidInput(msg)) => {
            HttpResponse::BadRequest().json(error_body(msg))
        }
        Err(err) => HttpResponse::InternalServerError().json(error_body(err.to_string())),
    }
}

/// GET /v1/queue/{operation}/{queue_id} - position and status, recomputed
/// on every call
#[get("/queue/{operation}/{queue_id}")]
pub async fn queue_entry_status(
    path: web::Path<(String, String)>,
    ctx: web::Data<Arc<AppContext>>,
) -> impl Responder {
    let (raw_operation, raw_queue_id) = path.into_inner();
    let operation = match parse_operation(&raw_operation) {
        Ok(op) => op,
        Err(response) => return response,
    };
    let Ok(queue_id) = QueueId::try_new(raw_queue_id.as_str()) else {
        return HttpResponse::NotFound()
            .json(error_body(format!("Queue entry {} not found", raw_queue_id)));
    };

    let queue = ctx.admission().queue();
    let Some(entry) = queue.get(&queue_id) else {
        return HttpResponse::NotFound()
            .json(error_body(format!("Queue entry {} not found", raw_queue_id)));
    };
    if entry.operation != operation {
        return HttpResponse::NotFound()
            .json(error_body(format!("Queue entry {} not found", raw_queue_id)));
    }

    let position = queue.position(&queue_id).unwrap_or(0);
    let estimated_wait_seconds = ctx.admission().estimated_wait(&queue_id).unwrap_or(0);
    HttpResponse::Ok().json(QueueEntryResponse {
        queue_id,
        operation: entry.operation,
        job_id: entry.job_id,
        status: entry.status,
        position,
        estimated_wait_seconds,
        run_id: entry.run_id,
    })
}
