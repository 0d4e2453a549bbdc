//! Shared test harness: a fully wired orchestration core backed by an
//! in-memory job store and /bin/sh as the pipeline program.

// Not every test binary uses every helper
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use applyflow_commons::models::RunStatus;
use applyflow_commons::RunId;
use applyflow_core::admission::AdmissionController;
use applyflow_core::exec::{PipelineSettings, ProcessExecutor};
use applyflow_core::persist::PersistenceBridge;
use applyflow_core::runs::RunRegistry;
use applyflow_store::{InMemoryJobStore, JobStore};

pub struct TestHarness {
    pub registry: Arc<RunRegistry>,
    pub admission: Arc<AdmissionController>,
    pub executor: Arc<ProcessExecutor>,
    pub bridge: Arc<PersistenceBridge>,
    pub store: Arc<InMemoryJobStore>,
    // Held for the lifetime of the harness so the directories survive
    pub output_dir: TempDir,
    pub state_dir: TempDir,
}

impl TestHarness {
    /// Build a harness whose pipeline program is `sh -c <script>`.
    /// Extra pipeline flags appended by the executor land in the
    /// script's positional parameters and are ignored.
    pub fn new(script: &str, max_concurrency: usize, run_timeout: Duration) -> Self {
        let output_dir = TempDir::new().expect("output dir");
        let state_dir = TempDir::new().expect("state dir");

        let store = Arc::new(InMemoryJobStore::new());
        let bridge = Arc::new(PersistenceBridge::new(Some(
            store.clone() as Arc<dyn JobStore>
        )));
        let registry = Arc::new(RunRegistry::new(500));

        let settings = PipelineSettings {
            command: vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()],
            output_dir: output_dir.path().to_path_buf(),
            state_dir: state_dir.path().to_path_buf(),
            run_timeout,
        };
        let executor = Arc::new(ProcessExecutor::new(
            settings,
            registry.clone(),
            bridge.clone(),
        ));

        let admission = Arc::new(AdmissionController::new(
            registry.clone(),
            executor.clone(),
            bridge.clone(),
            max_concurrency,
            Duration::from_secs(60),
            None,
        ));

        Self {
            registry,
            admission,
            executor,
            bridge,
            store,
            output_dir,
            state_dir,
        }
    }

    /// Poll until the run reaches a terminal status, or panic after
    /// `deadline` elapses.
    pub async fn wait_terminal(&self, run_id: &RunId, deadline: Duration) -> RunStatus {
        let start = std::time::Instant::now();
        loop {
            if let Some(run) = self.registry.snapshot(run_id) {
                if run.status.is_terminal() {
                    return run.status;
                }
            }
            assert!(
                start.elapsed() < deadline,
                "run {} did not finish within {:?}",
                run_id,
                deadline
            );
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}
