//! Central service context.
//!
//! Constructed exactly once at startup and passed explicitly to the HTTP
//! layer (`web::Data<Arc<AppContext>>`). There is deliberately no global
//! accessor: every component receives its dependencies at construction
//! time, which keeps "construct once, reuse" semantics without hidden
//! process-wide mutable state.

use std::sync::Arc;

use crate::admission::AdmissionController;
use crate::diagnostics::DiagnosticsAggregator;
use crate::exec::{PipelineSettings, ProcessExecutor};
use crate::persist::PersistenceBridge;
use crate::runs::RunRegistry;

pub struct AppContext {
    registry: Arc<RunRegistry>,
    admission: Arc<AdmissionController>,
    executor: Arc<ProcessExecutor>,
    bridge: Arc<PersistenceBridge>,
    diagnostics: Arc<DiagnosticsAggregator>,
}

impl AppContext {
    pub fn new(
        registry: Arc<RunRegistry>,
        admission: Arc<AdmissionController>,
        executor: Arc<ProcessExecutor>,
        bridge: Arc<PersistenceBridge>,
        diagnostics: Arc<DiagnosticsAggregator>,
    ) -> Self {
        Self {
            registry,
            admission,
            executor,
            bridge,
            diagnostics,
        }
    }

    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    pub fn executor(&self) -> &Arc<ProcessExecutor> {
        &self.executor
    }

    pub fn bridge(&self) -> &Arc<PersistenceBridge> {
        &self.bridge
    }

    pub fn diagnostics(&self) -> &Arc<DiagnosticsAggregator> {
        &self.diagnostics
    }

    /// Pipeline paths and limits, shared with the artifact-serving
    /// handlers.
    pub fn pipeline_settings(&self) -> &PipelineSettings {
        self.executor.settings()
    }
}
