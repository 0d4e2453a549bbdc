//! Deadline enforcement and cancellation semantics.

mod common;

use std::time::Duration;

use applyflow_commons::models::{RunOptions, RunStatus};
use common::TestHarness;

/// A child that outlives its deadline is killed and the run fails.
#[tokio::test]
async fn test_timeout_kills_child() {
    let harness = TestHarness::new("sleep 30", 2, Duration::from_millis(400));

    let run_id = harness.admission.submit("42", RunOptions::default()).unwrap();
    let started = std::time::Instant::now();
    let status = harness.wait_terminal(&run_id, Duration::from_secs(10)).await;

    assert_eq!(status, RunStatus::Failed);
    // Deadline plus a small grace margin, nowhere near the child's 30s
    assert!(started.elapsed() < Duration::from_secs(5));

    let (lines, _, _) = harness.registry.logs_since(&run_id, 0).unwrap();
    assert!(lines.iter().any(|l| l.contains("timed out")));
}

/// Cancelling a running run delivers a kill and finalizes it failed.
#[tokio::test]
async fn test_cancel_running_run() {
    let harness = TestHarness::new("sleep 30", 2, Duration::from_secs(60));

    let run_id = harness.admission.submit("42", RunOptions::default()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        harness.registry.snapshot(&run_id).unwrap().status,
        RunStatus::Running
    );

    harness.admission.cancel(&run_id).unwrap();
    let status = harness.wait_terminal(&run_id, Duration::from_secs(10)).await;
    assert_eq!(status, RunStatus::Failed);

    let (lines, _, _) = harness.registry.logs_since(&run_id, 0).unwrap();
    assert!(lines.iter().any(|l| l.contains("cancelled")));
}

/// A second cancellation of the same run is a no-op, not an error, and
/// the terminal status matches the first cancellation's outcome.
#[tokio::test]
async fn test_cancel_is_idempotent() {
    let harness = TestHarness::new("sleep 30", 2, Duration::from_secs(60));

    let run_id = harness.admission.submit("42", RunOptions::default()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    harness.admission.cancel(&run_id).unwrap();
    let first = harness.wait_terminal(&run_id, Duration::from_secs(10)).await;

    let second = harness.admission.cancel(&run_id).unwrap();
    assert_eq!(first, RunStatus::Failed);
    assert_eq!(second, RunStatus::Failed);
}

/// Cancelling a queued run takes effect before the child ever spawns.
#[tokio::test]
async fn test_cancel_queued_run() {
    let harness = TestHarness::new("sleep 0.4", 1, Duration::from_secs(60));

    let first = harness.admission.submit("7", RunOptions::default()).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    let second = harness.admission.submit("42", RunOptions::default()).unwrap();

    harness.admission.cancel(&second).unwrap();

    let status = harness.wait_terminal(&second, Duration::from_secs(10)).await;
    assert_eq!(status, RunStatus::Failed);
    let (lines, _, _) = harness.registry.logs_since(&second, 0).unwrap();
    assert!(lines.iter().any(|l| l.contains("before the pipeline process started")));

    // The occupant is unaffected
    let status = harness.wait_terminal(&first, Duration::from_secs(10)).await;
    assert_eq!(status, RunStatus::Completed);
}

/// Unknown run ids are a not-found error, never a silent success.
#[tokio::test]
async fn test_cancel_unknown_run() {
    let harness = TestHarness::new("echo ok", 2, Duration::from_secs(60));
    let bogus = applyflow_commons::RunId::generate();
    assert!(harness.admission.cancel(&bogus).is_err());
}
