//! End-to-end run lifecycle: spawn, stream, finalize, persist.

mod common;

use std::time::Duration;

use serde_json::{json, Map, Value};

use applyflow_commons::models::{JobKey, RunOptions, RunStatus};
use applyflow_store::JobStore;
use common::TestHarness;

fn seeded_job(harness: &TestHarness, raw_id: &str) -> JobKey {
    let key = JobKey::from_raw(raw_id);
    let mut record = Map::new();
    record.insert("title".to_string(), Value::String("Platform Engineer".to_string()));
    harness.store.seed(key.clone(), record);
    key
}

/// Child writes exactly 3 lines then exits 0 with no handoff file:
/// the run completes with no final state and exactly 3 log lines.
#[tokio::test]
async fn test_three_lines_exit_zero() {
    let harness = TestHarness::new(
        "echo one; echo two; echo three",
        2,
        Duration::from_secs(30),
    );
    seeded_job(&harness, "42");

    let run_id = harness.admission.submit("42", RunOptions::default()).unwrap();
    let status = harness.wait_terminal(&run_id, Duration::from_secs(10)).await;
    assert_eq!(status, RunStatus::Completed);

    let run = harness.registry.snapshot(&run_id).unwrap();
    assert!(run.final_state.is_none());
    let (lines, _, terminal) = harness.registry.logs_since(&run_id, 0).unwrap();
    assert!(terminal);
    assert_eq!(lines, vec!["one", "two", "three"]);
}

/// Non-zero child exit finalizes the run as failed with a readable log line.
#[tokio::test]
async fn test_nonzero_exit_fails_run() {
    let harness = TestHarness::new("echo boom; exit 3", 2, Duration::from_secs(30));
    seeded_job(&harness, "42");

    let run_id = harness.admission.submit("42", RunOptions::default()).unwrap();
    let status = harness.wait_terminal(&run_id, Duration::from_secs(10)).await;
    assert_eq!(status, RunStatus::Failed);

    let (lines, _, _) = harness.registry.logs_since(&run_id, 0).unwrap();
    assert!(lines.iter().any(|l| l.contains("exited with code 3")));
}

/// A handoff file keyed by run id is captured as the run's final state
/// and deleted afterwards.
#[tokio::test]
async fn test_handoff_state_captured() {
    // The executor exports APPLYFLOW_RUN_ID and APPLYFLOW_STATE_DIR
    let script = r#"printf '{"pain_points":"long hours","company_research":"growing"}' \
        > "$APPLYFLOW_STATE_DIR/pipeline_state_$APPLYFLOW_RUN_ID.json""#;
    let harness = TestHarness::new(script, 2, Duration::from_secs(30));
    seeded_job(&harness, "42");

    let run_id = harness.admission.submit("42", RunOptions::default()).unwrap();
    let status = harness.wait_terminal(&run_id, Duration::from_secs(10)).await;
    assert_eq!(status, RunStatus::Completed);

    let run = harness.registry.snapshot(&run_id).unwrap();
    let state = run.final_state.expect("final state should be captured");
    assert_eq!(state["pain_points"], json!("long hours"));

    // Single-use handoff: the file must be gone
    let leftover: Vec<_> = std::fs::read_dir(harness.state_dir.path())
        .unwrap()
        .collect();
    assert!(leftover.is_empty(), "handoff file should be consumed");
}

/// Artifacts written under applications/<company>/<role>/ are discovered
/// and persisted onto the job record.
#[tokio::test]
async fn test_artifact_discovery_and_persistence() {
    let harness = TestHarness::new("echo ok", 2, Duration::from_secs(30));
    let key = seeded_job(&harness, "42");

    // Pre-create the output tree; discovery runs at finalization and
    // only cares about what exists under applications/
    let role_dir = harness.output_dir.path().join("applications/Acme/Architect");
    std::fs::create_dir_all(&role_dir).unwrap();
    std::fs::write(role_dir.join("CV.md"), "cv text").unwrap();

    let run_id = harness.admission.submit("42", RunOptions::default()).unwrap();
    let status = harness.wait_terminal(&run_id, Duration::from_secs(10)).await;
    assert_eq!(status, RunStatus::Completed);

    let run = harness.registry.snapshot(&run_id).unwrap();
    assert_eq!(run.artifacts.len(), 1);
    assert_eq!(run.artifacts.get("cv_md_url").map(String::as_str), Some("CV.md"));

    // Bookkeeping reached the durable record
    let record = harness.store.get_job(&key).await.unwrap().unwrap();
    assert_eq!(record["pipeline_status"], json!("completed"));
    assert_eq!(record["pipeline_run_id"], json!(run_id.as_str()));
    assert!(record.contains_key("pipeline_completed_at"));
}

/// A run against a job id with no durable record still completes; the
/// missing record makes persistence a no-op, never an error.
#[tokio::test]
async fn test_unknown_job_record_does_not_fail_run() {
    let harness = TestHarness::new("echo ok", 2, Duration::from_secs(30));

    let run_id = harness
        .admission
        .submit("no-such-job", RunOptions::default())
        .unwrap();
    let status = harness.wait_terminal(&run_id, Duration::from_secs(10)).await;
    assert_eq!(status, RunStatus::Completed);

    let key = JobKey::from_raw("no-such-job");
    assert!(harness.store.get_job(&key).await.unwrap().is_none());
}

/// Blank job ids are rejected at admission, before any run exists.
#[tokio::test]
async fn test_blank_job_id_rejected() {
    let harness = TestHarness::new("echo ok", 2, Duration::from_secs(30));
    assert!(harness.admission.submit("  ", RunOptions::default()).is_err());
    assert_eq!(harness.registry.queued_count(), 0);
}
