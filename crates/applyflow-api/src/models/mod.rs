//! API request and response models.

mod requests;
mod responses;

pub use requests::{BulkRunRequest, LogsQuery, QueueRequest, RunRequest};
pub use responses::{
    error_body, BulkRunItem, BulkRunResponse, CancelResponse, HealthResponse, QueueEntryResponse,
    QueueResponse, RunResponse, StatusResponse,
};
