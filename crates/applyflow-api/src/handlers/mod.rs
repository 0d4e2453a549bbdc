//! Route handlers.

pub mod artifacts;
pub mod diagnostics;
pub mod health;
pub mod logs;
pub mod queue;
pub mod runs;

pub(crate) use helpers::parse_run_id;

mod helpers {
    use actix_web::HttpResponse;

    use applyflow_commons::RunId;

    use crate::models::error_body;

    /// Parse a run id path segment; malformed ids get the same 404 as
    /// unknown ones so the URL space leaks nothing.
    pub fn parse_run_id(raw: &str) -> Result<RunId, HttpResponse> {
        RunId::try_new(raw)
            .map_err(|_| HttpResponse::NotFound().json(error_body(format!("Run {} not found", raw))))
    }
}
