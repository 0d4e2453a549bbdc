//! Artifact serving.

use std::sync::Arc;

use actix_web::{get, web, HttpResponse, Responder};
use log::warn;

use applyflow_core::exec::artifacts;
use applyflow_core::AppContext;

use crate::models::error_body;

use super::parse_run_id;

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("md") => "text/markdown; charset=utf-8",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// GET /v1/artifacts/{run_id}/{filename} - serve a discovered artifact
#[get("/artifacts/{run_id}/{filename}")]
pub async fn serve_artifact(
    path: web::Path<(String, String)>,
    ctx: web::Data<Arc<AppContext>>,
) -> impl Responder {
    let (raw_run_id, filename) = path.into_inner();
    let run_id = match parse_run_id(&raw_run_id) {
        Ok(run_id) => run_id,
        Err(response) => return response,
    };
    let Some(run) = ctx.registry().snapshot(&run_id) else {
        return HttpResponse::NotFound().json(error_body(format!("Run {} not found", raw_run_id)));
    };

    // Only files the run actually discovered are servable
    if !run.artifacts.values().any(|f| f == &filename) {
        return HttpResponse::NotFound().json(error_body(format!(
            "Artifact {} not found for run {}",
            filename, run_id
        )));
    }

    let output_dir = &ctx.pipeline_settings().output_dir;
    let Some(file_path) = artifacts::locate(output_dir, &filename) else {
        return HttpResponse::NotFound().json(error_body(format!(
            "Artifact {} no longer present on disk",
            filename
        )));
    };

    match tokio::fs::read(&file_path).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(content_type_for(&filename))
            .body(bytes),
        Err(e) => {
            warn!("Failed to read artifact {}: {}", file_path.display(), e);
            HttpResponse::NotFound().json(error_body(format!("Artifact {} unreadable", filename)))
        }
    }
}
