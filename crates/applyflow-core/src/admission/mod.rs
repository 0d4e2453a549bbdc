//! Admission control: the bounded-concurrency gate and the sub-operation
//! queue.

mod controller;
mod queue;

pub use controller::AdmissionController;
pub use queue::{OperationQueue, QueueEntry};
