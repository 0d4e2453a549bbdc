//! Pipeline child-process supervision.
//!
//! One `execute` call per admitted run: spawn the configured pipeline
//! program with a structured argument list (no shell), merge its stdout
//! and stderr line-by-line into the run's log buffer as lines arrive,
//! enforce the run deadline measured from spawn, honor external
//! cancellation through the registry's cancel handle, and finalize the run
//! exactly once. `execute` never propagates an error to its caller; every
//! fault ends as a `Failed` run with the failure on the run's own log.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::Instant;

use applyflow_commons::models::RunStatus;
use applyflow_commons::{OrchestratorError, Result, RunId};

use crate::persist::PersistenceBridge;
use crate::runs::{Run, RunRegistry};

use super::{artifacts, handoff};

/// Executor-facing settings, extracted from the validated server config.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Program and leading arguments; the job id and option flags are
    /// appended per run
    pub command: Vec<String>,
    /// Root of the generated-output tree (`applications/...`)
    pub output_dir: PathBuf,
    /// Directory the pipeline writes its state-handoff file into
    pub state_dir: PathBuf,
    /// Per-run deadline, measured from process spawn
    pub run_timeout: Duration,
}

/// Result of one supervised execution.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub success: bool,
    pub artifacts: BTreeMap<String, String>,
    pub final_state: Option<Value>,
}

impl ExecOutcome {
    fn failure() -> Self {
        Self {
            success: false,
            artifacts: BTreeMap::new(),
            final_state: None,
        }
    }
}

/// How the child left the supervision loop.
enum ChildEnd {
    Exited(Option<i32>),
    TimedOut,
    Cancelled,
}

pub struct ProcessExecutor {
    settings: PipelineSettings,
    registry: Arc<RunRegistry>,
    bridge: Arc<PersistenceBridge>,
}

impl ProcessExecutor {
    pub fn new(
        settings: PipelineSettings,
        registry: Arc<RunRegistry>,
        bridge: Arc<PersistenceBridge>,
    ) -> Self {
        Self {
            settings,
            registry,
            bridge,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Supervise one run to completion. Infallible from the caller's
    /// perspective: faults in the supervising logic itself are caught,
    /// logged with a structured record, and finalize the run as `Failed`.
    pub async fn execute(&self, run_id: &RunId) -> ExecOutcome {
        match self.supervise(run_id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Structured record plus a human-readable duplicate
                error!(
                    "executor fault: kind={} run_id={} message={} trace={:?}",
                    err.kind(),
                    run_id,
                    err,
                    err
                );
                self.registry
                    .append_log(run_id, &format!("Run failed: {}", err));
                self.finalize_failed(run_id, &err.to_string()).await;
                ExecOutcome::failure()
            }
        }
    }

    async fn supervise(&self, run_id: &RunId) -> Result<ExecOutcome> {
        let run = self
            .registry
            .snapshot(run_id)
            .ok_or_else(|| OrchestratorError::NotFound(format!("Run {} not found", run_id)))?;
        let cancel = self
            .registry
            .cancel_handle(run_id)
            .ok_or_else(|| OrchestratorError::NotFound(format!("Run {} not found", run_id)))?;

        // Cancelled while still queued: never spawn
        if cancel.is_requested() {
            self.registry
                .append_log(run_id, "Run cancelled before the pipeline process started");
            self.finalize_failed(run_id, "cancelled before start").await;
            return Ok(ExecOutcome::failure());
        }

        let mut command = self.build_command(&run)?;
        let mut child = command
            .spawn()
            .map_err(|e| OrchestratorError::Execution(format!("Failed to spawn pipeline: {}", e)))?;
        // Deadline is measured from spawn, not from admission
        let deadline = Instant::now() + self.settings.run_timeout;
        info!(
            "Run {} spawned pipeline for job {} (pid {:?})",
            run_id,
            run.job_id,
            child.id()
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OrchestratorError::Execution("Pipeline stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| OrchestratorError::Execution("Pipeline stderr not captured".into()))?;
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut timed_out = false;
        let mut cancelled = false;
        let mut kill_sent = false;

        let end = loop {
            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => self.registry.append_log(run_id, &line),
                    Ok(None) => stdout_open = false,
                    Err(e) => {
                        warn!("Run {} stdout read error: {}", run_id, e);
                        stdout_open = false;
                    }
                },
                line = stderr_lines.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => self.registry.append_log(run_id, &line),
                    Ok(None) => stderr_open = false,
                    Err(e) => {
                        warn!("Run {} stderr read error: {}", run_id, e);
                        stderr_open = false;
                    }
                },
                _ = tokio::time::sleep_until(deadline), if !timed_out && !cancelled => {
                    timed_out = true;
                    self.registry.append_log(
                        run_id,
                        &format!(
                            "Run exceeded the {}s timeout; killing pipeline process",
                            self.settings.run_timeout.as_secs()
                        ),
                    );
                },
                _ = cancel.cancelled(), if !timed_out && !cancelled => {
                    cancelled = true;
                    self.registry
                        .append_log(run_id, "Cancellation requested; killing pipeline process");
                },
                status = child.wait() => {
                    let status = status.map_err(|e| {
                        OrchestratorError::Execution(format!("Failed to await pipeline exit: {}", e))
                    })?;
                    if timed_out {
                        break ChildEnd::TimedOut;
                    }
                    if cancelled && !status.success() {
                        break ChildEnd::Cancelled;
                    }
                    break ChildEnd::Exited(status.code());
                },
            }

            // Deliver the kill outside the select so the wait() borrow has ended
            if (timed_out || cancelled) && !kill_sent {
                kill_sent = true;
                if let Err(e) = child.start_kill() {
                    warn!("Run {} kill signal failed: {}", run_id, e);
                }
            }
        };

        // The pipes may still hold buffered output after exit
        while let Ok(Some(line)) = stdout_lines.next_line().await {
            self.registry.append_log(run_id, &line);
        }
        while let Ok(Some(line)) = stderr_lines.next_line().await {
            self.registry.append_log(run_id, &line);
        }

        match end {
            ChildEnd::Exited(Some(0)) => self.finalize_completed(run_id, &run.job_id).await,
            ChildEnd::Exited(Some(code)) => {
                let reason = format!("Pipeline exited with code {}", code);
                self.registry
                    .append_log(run_id, &format!("Run failed: {}", reason));
                self.finalize_failed(run_id, &reason).await;
                Ok(ExecOutcome::failure())
            }
            ChildEnd::Exited(None) => {
                let reason = "Pipeline terminated by signal".to_string();
                self.registry
                    .append_log(run_id, &format!("Run failed: {}", reason));
                self.finalize_failed(run_id, &reason).await;
                Ok(ExecOutcome::failure())
            }
            ChildEnd::TimedOut => {
                let reason = format!(
                    "Run timed out after {}s",
                    self.settings.run_timeout.as_secs()
                );
                self.registry
                    .append_log(run_id, &format!("Run failed: {}", reason));
                self.finalize_failed(run_id, &reason).await;
                Ok(ExecOutcome::failure())
            }
            ChildEnd::Cancelled => {
                self.registry
                    .append_log(run_id, "Run failed: cancelled by request");
                self.finalize_failed(run_id, "cancelled by request").await;
                Ok(ExecOutcome::failure())
            }
        }
    }

    /// Build the structured pipeline invocation. No shell interpolation:
    /// every value is its own argv entry.
    fn build_command(&self, run: &Run) -> Result<Command> {
        let program = self.settings.command.first().ok_or_else(|| {
            OrchestratorError::Configuration("Pipeline command is empty".into())
        })?;
        let mut command = Command::new(program);
        command.args(&self.settings.command[1..]);
        command.arg("--job-id").arg(&run.job_id);
        if let Some(profile) = &run.options.profile_ref {
            command.arg("--profile").arg(profile);
        }
        if let Some(tier) = run.options.processing_tier {
            command.arg("--tier").arg(tier.as_str());
        }
        if let Some(operation) = run.operation {
            command.arg("--operation").arg(operation.pipeline_flag());
        }
        if run.options.force_refresh {
            command.arg("--force-refresh");
        }
        if run.options.use_llm {
            command.arg("--use-llm");
        }
        if run.options.use_annotations {
            command.arg("--use-annotations");
        }
        command.env("APPLYFLOW_RUN_ID", run.run_id.as_str());
        command.env(
            "APPLYFLOW_STATE_DIR",
            self.settings.state_dir.as_os_str(),
        );
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(command)
    }

    async fn finalize_completed(&self, run_id: &RunId, job_id: &str) -> Result<ExecOutcome> {
        // Directory walk and handoff read are blocking filesystem work;
        // keep them off the async runtime
        let output_dir = self.settings.output_dir.clone();
        let state_dir = self.settings.state_dir.clone();
        let handoff_run_id = run_id.clone();
        let (found, final_state) = tokio::task::spawn_blocking(move || {
            let found = artifacts::discover(&output_dir);
            let state = handoff::take(&state_dir, &handoff_run_id);
            (found, state)
        })
        .await
        .map_err(|e| OrchestratorError::Execution(format!("Artifact discovery task failed: {}", e)))?;

        self.registry.set_artifacts(run_id, found.clone());
        if let Some(state) = &final_state {
            self.registry.set_final_state(run_id, state.clone());
        }
        self.registry.transition(run_id, RunStatus::Completed)?;
        info!(
            "Run {} completed: {} artifact(s), final_state={}",
            run_id,
            found.len(),
            final_state.is_some()
        );

        if let Some(run) = self.registry.snapshot(run_id) {
            self.bridge
                .persist(
                    job_id,
                    run_id,
                    RunStatus::Completed,
                    run.started_at,
                    run.updated_at,
                    &run.artifacts,
                    run.final_state.as_ref(),
                )
                .await;
        }

        Ok(ExecOutcome {
            success: true,
            artifacts: found,
            final_state,
        })
    }

    async fn finalize_failed(&self, run_id: &RunId, reason: &str) {
        if let Err(e) = self.registry.transition(run_id, RunStatus::Failed) {
            // Already terminal (e.g. cancel raced completion); keep the first outcome
            warn!("Run {} could not be marked failed: {}", run_id, e);
            return;
        }
        if let Some(run) = self.registry.snapshot(run_id) {
            self.bridge.mark_failed(&run.job_id, reason).await;
        }
    }
}
