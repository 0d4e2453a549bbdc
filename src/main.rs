// Applyflow Server entrypoint
//!
//! The heavy lifting (initialization, middleware wiring, HTTP run loop)
//! lives in dedicated modules so this file remains a thin orchestrator.

use anyhow::Result;
use applyflow_server::{config, lifecycle, logging};
use config::OrchestratorConfig;
use log::info;
use std::env;

#[actix_web::main]
async fn main() -> Result<()> {
    // Config path can be overridden on the command line or environment
    let config_path = env::args()
        .nth(1)
        .or_else(|| env::var("APPLYFLOW_CONFIG").ok())
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match OrchestratorConfig::from_file(&config_path) {
        Ok(cfg) => {
            eprintln!(
                "Loaded config from: {}",
                std::fs::canonicalize(&config_path)
                    .unwrap_or_else(|_| std::path::PathBuf::from(&config_path))
                    .display()
            );
            cfg
        }
        Err(e) => {
            eprintln!("FATAL: Failed to load {}: {}", config_path, e);
            eprintln!("Server cannot start without valid configuration");
            std::process::exit(1);
        }
    };

    // Logging before any other side effects
    logging::init_logging(
        &config.logging.level,
        &config.logging.file_path,
        config.logging.log_to_console,
        &config.logging.format,
    )?;

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let build_date = env!("BUILD_DATE");
    let branch = env!("GIT_BRANCH");

    info!("╔═══════════════════════════════════════════════════════════════╗");
    info!("║          Applyflow Server v{:<36} ║", version);
    info!("╠═══════════════════════════════════════════════════════════════╣");
    info!("║  Commit:     {:<49} ║", commit);
    info!("║  Branch:     {:<49} ║", branch);
    info!("║  Built:      {:<49} ║", build_date);
    info!("╚═══════════════════════════════════════════════════════════════╝");

    config.log_summary();

    // Build application state and kick off background services
    let ctx = lifecycle::bootstrap(&config).await?;

    // Run HTTP server until termination signal is received
    lifecycle::run(&config, ctx).await
}
