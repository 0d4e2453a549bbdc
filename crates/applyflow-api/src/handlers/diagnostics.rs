//! Diagnostics endpoint.

use std::sync::Arc;

use actix_web::{get, web, HttpResponse, Responder};

use applyflow_core::AppContext;

/// GET /v1/diagnostics - full snapshot, recomputed on every call
#[get("/diagnostics")]
pub async fn diagnostics(ctx: web::Data<Arc<AppContext>>) -> impl Responder {
    let snapshot = ctx.diagnostics().collect().await;
    HttpResponse::Ok().json(snapshot)
}
