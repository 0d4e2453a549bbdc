//! Live log streaming.
//!
//! Chunked `text/plain` body: each chunk carries the log lines appended
//! since the previous one, polled from the registry's cursor. The stream
//! terminates once the run reaches a terminal status and the cursor has
//! drained. `?follow=false` returns the current buffer in one shot.

use std::sync::Arc;
use std::time::Duration;

use actix_web::web::Bytes;
use actix_web::{get, web, HttpResponse, Responder};
use futures_util::stream;

use applyflow_core::runs::RunRegistry;
use applyflow_core::AppContext;

use crate::models::{error_body, LogsQuery};

use super::parse_run_id;

/// How often the stream re-polls the registry for new lines.
const POLL_INTERVAL: Duration = Duration::from_millis(150);

/// GET /v1/jobs/{run_id}/logs
#[get("/jobs/{run_id}/logs")]
pub async fn stream_logs(
    path: web::Path<String>,
    query: web::Query<LogsQuery>,
    ctx: web::Data<Arc<AppContext>>,
) -> impl Responder {
    let raw = path.into_inner();
    let run_id = match parse_run_id(&raw) {
        Ok(run_id) => run_id,
        Err(response) => return response,
    };
    let Some(run) = ctx.registry().snapshot(&run_id) else {
        return HttpResponse::NotFound().json(error_body(format!("Run {} not found", raw)));
    };

    if !query.follow {
        let mut body = run.logs.lines().join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        return HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(body);
    }

    let registry: Arc<RunRegistry> = ctx.registry().clone();
    let body = stream::unfold((registry, run_id, 0u64), |(registry, run_id, cursor)| async move {
        loop {
            match registry.logs_since(&run_id, cursor) {
                None => return None,
                Some((lines, next_cursor, terminal)) => {
                    if !lines.is_empty() {
                        let mut chunk = lines.join("\n");
                        chunk.push('\n');
                        return Some((
                            Ok::<Bytes, actix_web::Error>(Bytes::from(chunk)),
                            (registry, run_id, next_cursor),
                        ));
                    }
                    if terminal {
                        return None;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    });

    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .streaming(body)
}
