//! Run model and in-memory registry.

mod log_buffer;
mod registry;

pub use log_buffer::LogBuffer;
pub use registry::{CancelHandle, Run, RunRegistry};
