//! Admission-gate behavior: the running count never exceeds the
//! configured cap and queued runs are promoted without a second request.

mod common;

use std::time::Duration;

use applyflow_commons::models::{RunOptions, RunStatus};
use common::TestHarness;

/// With cap 2 and four submissions, no sample of the registry ever
/// observes more than two running runs, and all four finish.
#[tokio::test]
async fn test_running_count_never_exceeds_cap() {
    let harness = TestHarness::new("sleep 0.3", 2, Duration::from_secs(30));

    let mut run_ids = Vec::new();
    for job in ["1", "2", "3", "4"] {
        run_ids.push(harness.admission.submit(job, RunOptions::default()).unwrap());
    }

    let mut max_observed = 0;
    let start = std::time::Instant::now();
    loop {
        max_observed = max_observed.max(harness.registry.running_count());
        let done = run_ids
            .iter()
            .all(|id| harness.registry.snapshot(id).unwrap().status.is_terminal());
        if done {
            break;
        }
        assert!(start.elapsed() < Duration::from_secs(20), "runs stuck");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(max_observed <= 2, "observed {} concurrent runs", max_observed);
    for id in &run_ids {
        assert_eq!(
            harness.registry.snapshot(id).unwrap().status,
            RunStatus::Completed
        );
    }
}

/// Cap 1: the second submission reports queued while the first runs,
/// then transitions to running on its own once the slot frees.
#[tokio::test]
async fn test_queued_run_promoted_when_slot_frees() {
    let harness = TestHarness::new("sleep 0.4", 1, Duration::from_secs(30));

    let first = harness.admission.submit("7", RunOptions::default()).unwrap();
    // Give the first run a moment to claim the only slot
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        harness.registry.snapshot(&first).unwrap().status,
        RunStatus::Running
    );

    let second = harness.admission.submit("42", RunOptions::default()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        harness.registry.snapshot(&second).unwrap().status,
        RunStatus::Queued
    );

    // No further request: the queued run must still reach a terminal state
    let status = harness.wait_terminal(&second, Duration::from_secs(10)).await;
    assert_eq!(status, RunStatus::Completed);
    assert_eq!(
        harness.registry.snapshot(&first).unwrap().status,
        RunStatus::Completed
    );
}

/// Bulk submission admits every job and returns one run id per job.
#[tokio::test]
async fn test_bulk_submission() {
    let harness = TestHarness::new("echo ok", 3, Duration::from_secs(30));

    let jobs: Vec<String> = ["10", "11", "12"].iter().map(|s| s.to_string()).collect();
    let run_ids = harness
        .admission
        .submit_bulk(&jobs, RunOptions::default())
        .unwrap();
    assert_eq!(run_ids.len(), 3);

    for id in &run_ids {
        let status = harness.wait_terminal(id, Duration::from_secs(10)).await;
        assert_eq!(status, RunStatus::Completed);
    }
}

/// A blank job id anywhere in the batch rejects the whole submission
/// before any run exists: no runs are created for the valid ids.
#[tokio::test]
async fn test_bulk_rejects_whole_batch_on_blank_id() {
    let harness = TestHarness::new("sleep 5", 3, Duration::from_secs(30));

    let jobs: Vec<String> = ["1", "  ", "3"].iter().map(|s| s.to_string()).collect();
    assert!(harness
        .admission
        .submit_bulk(&jobs, RunOptions::default())
        .is_err());

    // Nothing was admitted, not even the ids before the blank one
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(harness.registry.queued_count(), 0);
    assert_eq!(harness.registry.running_count(), 0);
}
