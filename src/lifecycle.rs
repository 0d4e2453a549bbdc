//! Server lifecycle: bootstrap of application components and the
//! HTTP run loop. The heavy lifting lives here so main.rs stays a
//! thin orchestrator.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use log::{debug, info, warn};

use applyflow_api::handlers::health::HealthOptions;
use applyflow_api::middleware::auth::{AuthSettings, SecretAuth};
use applyflow_api::routes;
use applyflow_core::admission::AdmissionController;
use applyflow_core::app_context::AppContext;
use applyflow_core::diagnostics::{AlertLog, DiagnosticsAggregator, JobStoreProbe, TcpProbe};
use applyflow_core::exec::{PipelineSettings, ProcessExecutor};
use applyflow_core::notify::LogNotifier;
use applyflow_core::persist::PersistenceBridge;
use applyflow_core::runs::RunRegistry;
use applyflow_store::{JobStore, JsonFileJobStore};

use crate::config::OrchestratorConfig;
use crate::middleware;

/// How often the background sweeper prunes finished runs and queue entries.
const PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Probes must answer within this window or be reported as timed out.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Build the application component graph from validated configuration.
pub async fn bootstrap(config: &OrchestratorConfig) -> Result<Arc<AppContext>> {
    let phase_start = std::time::Instant::now();

    // Working directories must exist before the first run is admitted
    std::fs::create_dir_all(&config.pipeline.output_dir)?;
    std::fs::create_dir_all(&config.pipeline.state_dir)?;

    // Job store (optional; runs execute fine without persistence)
    let store: Option<Arc<dyn JobStore>> = if config.storage.enabled {
        if let Some(parent) = std::path::Path::new(&config.storage.job_store_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = JsonFileJobStore::open(&config.storage.job_store_path)
            .map_err(|e| anyhow::anyhow!("Failed to open job store: {}", e))?;
        info!("Job store opened at {}", config.storage.job_store_path);
        Some(Arc::new(store))
    } else {
        warn!("Persistence disabled - run results will not be written to the job store");
        None
    };

    let bridge = Arc::new(PersistenceBridge::new(store.clone()));
    let registry = Arc::new(RunRegistry::new(config.orchestrator.log_buffer_cap));

    let settings = PipelineSettings {
        command: config.pipeline.command.clone(),
        output_dir: config.pipeline.output_dir.clone().into(),
        state_dir: config.pipeline.state_dir.clone().into(),
        run_timeout: Duration::from_secs(config.orchestrator.run_timeout_seconds),
    };
    let executor = Arc::new(ProcessExecutor::new(settings, registry.clone(), bridge.clone()));

    let admission = Arc::new(AdmissionController::new(
        registry.clone(),
        executor.clone(),
        bridge.clone(),
        config.orchestrator.max_concurrency,
        Duration::from_secs(config.orchestrator.nominal_item_duration_seconds),
        Some(Arc::new(LogNotifier)),
    ));

    // Diagnostics: probe the job store plus any configured external services
    let alerts = Arc::new(AlertLog::new(100));
    let mut diagnostics = DiagnosticsAggregator::new(
        registry.clone(),
        admission.queue().clone(),
        alerts,
        config.orchestrator.max_concurrency,
        PROBE_TIMEOUT,
    );
    if let Some(store) = &store {
        diagnostics.register_probe(Arc::new(JobStoreProbe::new(store.clone())));
    }
    if let Some(addr) = &config.dependencies.pdf_service_addr {
        diagnostics.register_probe(Arc::new(TcpProbe::new("pdf_service", addr.clone())));
    }
    let diagnostics = Arc::new(diagnostics);

    let ctx = Arc::new(AppContext::new(
        registry,
        admission,
        executor,
        bridge,
        diagnostics,
    ));

    spawn_prune_task(ctx.clone(), config.orchestrator.run_retention_hours);

    debug!(
        "Application components initialized ({:.2}ms)",
        phase_start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(ctx)
}

/// Periodically drop terminal runs and finished queue entries that have
/// aged past the retention window.
fn spawn_prune_task(ctx: Arc<AppContext>, retention_hours: i64) {
    tokio::spawn(async move {
        let retention = chrono::Duration::hours(retention_hours);
        let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; skip it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let runs = ctx.registry().prune_finished(retention);
            let entries = ctx.admission().queue().prune_finished(retention);
            if runs > 0 || entries > 0 {
                debug!("Pruned {} finished runs, {} queue entries", runs, entries);
            }
        }
    });
}

/// Run the HTTP server until a termination signal is received.
pub async fn run(config: &OrchestratorConfig, ctx: Arc<AppContext>) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {}", bind_addr);
    debug!("Endpoints mounted under /v1 (jobs, queue, logs, artifacts, health, diagnostics)");

    let auth_settings = AuthSettings {
        secret: config.auth.api_secret.clone(),
        required: config.auth.production,
    };
    if !auth_settings.required && auth_settings.secret.is_none() {
        warn!("API authentication is DISABLED - set auth.api_secret before exposing this server");
    }

    let health_options = HealthOptions {
        pdf_service_addr: config.dependencies.pdf_service_addr.clone(),
    };

    let cors_config = config.clone();
    let workers = if config.server.workers == 0 {
        num_cpus::get()
    } else {
        config.server.workers
    };

    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::request_logger())
            .wrap(middleware::build_cors_from_config(&cors_config))
            .wrap(SecretAuth::new(auth_settings.clone()))
            .app_data(web::Data::new(ctx.clone()))
            .app_data(web::Data::new(health_options.clone()))
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)
    .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", bind_addr, e))?;

    info!("Server ready on http://{} ({} workers)", bind_addr, workers);
    server.run().await?;

    info!("Server stopped");
    Ok(())
}
