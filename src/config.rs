// Configuration module
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
    #[serde(default)]
    pub dependencies: DependencySettings,
    #[serde(default)]
    pub cors: CorsSettings,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Execution limits for the run orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Maximum number of pipeline processes running at once (1..=20)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Hard wall-clock limit per run in seconds (60..=3600)
    #[serde(default = "default_run_timeout")]
    pub run_timeout_seconds: u64,
    /// Lines retained per run for log streaming (100..=10000)
    #[serde(default = "default_log_buffer_cap")]
    pub log_buffer_cap: usize,
    /// Nominal per-item duration used for queue wait estimates
    #[serde(default = "default_nominal_item_duration")]
    pub nominal_item_duration_seconds: u64,
    /// Terminal runs older than this are pruned from the registry
    #[serde(default = "default_run_retention_hours")]
    pub run_retention_hours: i64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            run_timeout_seconds: default_run_timeout(),
            log_buffer_cap: default_log_buffer_cap(),
            nominal_item_duration_seconds: default_nominal_item_duration(),
            run_retention_hours: default_run_retention_hours(),
        }
    }
}

/// Child pipeline process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Program and leading arguments, e.g. ["python3", "pipeline/main.py"]
    pub command: Vec<String>,
    /// Directory the pipeline writes application artifacts into
    pub output_dir: String,
    /// Directory for per-run handoff state files
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

/// API authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    /// When true, secret strength is enforced and auth is mandatory
    #[serde(default)]
    pub production: bool,
    /// Shared secret expected in Authorization: Bearer or X-Api-Secret
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self { production: false, api_secret: None }
    }
}

/// Job store persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_job_store_path")]
    pub job_store_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { enabled: default_true(), job_store_path: default_job_store_path() }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub file_path: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// External dependency endpoints probed by diagnostics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencySettings {
    /// host:port of the PDF rendering service, if one is deployed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_service_addr: Option<String>,
}

/// CORS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSettings {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self { allowed_origins: default_allowed_origins() }
    }
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_max_concurrency() -> usize {
    3
}

fn default_run_timeout() -> u64 {
    900
}

fn default_log_buffer_cap() -> usize {
    2000
}

fn default_nominal_item_duration() -> u64 {
    180
}

fn default_run_retention_hours() -> i64 {
    24
}

fn default_state_dir() -> String {
    "./data/state".to_string()
}

fn default_job_store_path() -> String {
    "./data/jobs.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_true() -> bool {
    true
}

/// Secrets that are rejected outright in production mode
const WEAK_SECRETS: &[&str] = &[
    "secret",
    "password",
    "changeme",
    "change-me",
    "default",
    "test",
    "admin",
    "applyflow",
];

impl OrchestratorConfig {
    /// Load configuration from a TOML file, apply environment overrides,
    /// then validate the result.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let mut config: OrchestratorConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides for sensitive configuration
    ///
    /// Supported environment variables:
    /// - APPLYFLOW_SERVER_HOST: Override server.host
    /// - APPLYFLOW_SERVER_PORT: Override server.port
    /// - APPLYFLOW_LOG_LEVEL: Override logging.level
    /// - APPLYFLOW_LOG_FILE: Override logging.file_path
    /// - APPLYFLOW_LOG_TO_CONSOLE: Override logging.log_to_console
    /// - APPLYFLOW_API_SECRET: Override auth.api_secret
    /// - APPLYFLOW_MAX_CONCURRENCY: Override orchestrator.max_concurrency
    /// - APPLYFLOW_RUN_TIMEOUT_SECONDS: Override orchestrator.run_timeout_seconds
    /// - APPLYFLOW_JOB_STORE_PATH: Override storage.job_store_path
    /// - APPLYFLOW_OUTPUT_DIR: Override pipeline.output_dir
    ///
    /// Environment variables take precedence over config.toml values
    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        use std::env;

        if let Ok(host) = env::var("APPLYFLOW_SERVER_HOST") {
            self.server.host = host;
        }

        if let Ok(port_str) = env::var("APPLYFLOW_SERVER_PORT") {
            self.server.port = port_str.parse().map_err(|_| {
                anyhow::anyhow!("Invalid APPLYFLOW_SERVER_PORT value: {}", port_str)
            })?;
        }

        if let Ok(level) = env::var("APPLYFLOW_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(path) = env::var("APPLYFLOW_LOG_FILE") {
            self.logging.file_path = path;
        }

        if let Ok(val) = env::var("APPLYFLOW_LOG_TO_CONSOLE") {
            self.logging.log_to_console = matches!(val.as_str(), "1" | "true" | "TRUE" | "True");
        }

        if let Ok(secret) = env::var("APPLYFLOW_API_SECRET") {
            self.auth.api_secret = Some(secret);
        }

        if let Ok(val) = env::var("APPLYFLOW_MAX_CONCURRENCY") {
            self.orchestrator.max_concurrency = val.parse().map_err(|_| {
                anyhow::anyhow!("Invalid APPLYFLOW_MAX_CONCURRENCY value: {}", val)
            })?;
        }

        if let Ok(val) = env::var("APPLYFLOW_RUN_TIMEOUT_SECONDS") {
            self.orchestrator.run_timeout_seconds = val.parse().map_err(|_| {
                anyhow::anyhow!("Invalid APPLYFLOW_RUN_TIMEOUT_SECONDS value: {}", val)
            })?;
        }

        if let Ok(path) = env::var("APPLYFLOW_JOB_STORE_PATH") {
            self.storage.job_store_path = path;
        }

        if let Ok(path) = env::var("APPLYFLOW_OUTPUT_DIR") {
            self.pipeline.output_dir = path;
        }

        Ok(())
    }

    /// Validate the configuration after loading
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }

        let c = self.orchestrator.max_concurrency;
        if !(1..=20).contains(&c) {
            anyhow::bail!("orchestrator.max_concurrency must be between 1 and 20, got {}", c);
        }

        let t = self.orchestrator.run_timeout_seconds;
        if !(60..=3600).contains(&t) {
            anyhow::bail!(
                "orchestrator.run_timeout_seconds must be between 60 and 3600, got {}",
                t
            );
        }

        let cap = self.orchestrator.log_buffer_cap;
        if !(100..=10_000).contains(&cap) {
            anyhow::bail!("orchestrator.log_buffer_cap must be between 100 and 10000, got {}", cap);
        }

        if self.pipeline.command.is_empty() {
            anyhow::bail!("pipeline.command must name at least the program to execute");
        }

        if self.pipeline.output_dir.trim().is_empty() {
            anyhow::bail!("pipeline.output_dir must not be empty");
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!("logging.level must be a valid log level, got '{}'", other),
        }

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("logging.format must be 'text' or 'json', got '{}'", other),
        }

        if self.auth.production {
            let secret = self
                .auth
                .api_secret
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("auth.api_secret is required in production"))?;
            validate_secret_strength(secret)?;
        }

        Ok(())
    }

    /// Log a redacted summary of the effective configuration at startup.
    /// Secrets are masked, never printed.
    pub fn log_summary(&self) {
        log::info!(
            "Server: {}:{} ({} workers)",
            self.server.host,
            self.server.port,
            self.server.workers
        );
        log::info!(
            "Orchestrator: max_concurrency={} run_timeout={}s log_buffer_cap={}",
            self.orchestrator.max_concurrency,
            self.orchestrator.run_timeout_seconds,
            self.orchestrator.log_buffer_cap
        );
        log::info!(
            "Pipeline: command='{}' output_dir={}",
            self.pipeline.command.join(" "),
            self.pipeline.output_dir
        );
        log::info!(
            "Storage: enabled={} path={}",
            self.storage.enabled,
            self.storage.job_store_path
        );
        log::info!(
            "Auth: production={} api_secret={}",
            self.auth.production,
            match &self.auth.api_secret {
                Some(s) => mask_secret(s),
                None => "(none)".to_string(),
            }
        );
        if let Some(addr) = &self.dependencies.pdf_service_addr {
            log::info!("Dependencies: pdf_service={}", redact_authority(addr));
        }
    }
}

/// Reject secrets that would be trivially guessable in production.
fn validate_secret_strength(secret: &str) -> anyhow::Result<()> {
    let lowered = secret.to_lowercase();
    if WEAK_SECRETS.contains(&lowered.as_str()) {
        anyhow::bail!("auth.api_secret is on the weak-secret denylist");
    }
    if secret.len() < 16 {
        anyhow::bail!("auth.api_secret must be at least 16 characters in production");
    }
    let distinct: std::collections::HashSet<char> = secret.chars().collect();
    if distinct.len() < 4 {
        anyhow::bail!("auth.api_secret must contain at least 4 distinct characters");
    }
    Ok(())
}

/// Mask a secret for log output, keeping only a short prefix.
fn mask_secret(secret: &str) -> String {
    if secret.len() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", &secret[..4])
    }
}

/// Strip userinfo credentials from a URI-like string before logging.
fn redact_authority(addr: &str) -> String {
    match addr.rfind('@') {
        Some(at) => {
            let scheme_end = addr.find("://").map(|i| i + 3).unwrap_or(0);
            format!("{}***@{}", &addr[..scheme_end], &addr[at + 1..])
        }
        None => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn base_config() -> OrchestratorConfig {
        OrchestratorConfig {
            server: ServerSettings { host: "127.0.0.1".to_string(), port: 8080, workers: 2 },
            orchestrator: OrchestratorSettings::default(),
            pipeline: PipelineSection {
                command: vec!["python3".to_string(), "pipeline/main.py".to_string()],
                output_dir: "./data/output".to_string(),
                state_dir: "./data/state".to_string(),
            },
            auth: AuthSection::default(),
            storage: StorageSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                file_path: "./logs/applyflow.log".to_string(),
                log_to_console: true,
                format: "text".to_string(),
            },
            dependencies: DependencySettings::default(),
            cors: CorsSettings::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = base_config();
        config.orchestrator.max_concurrency = 0;
        assert!(config.validate().is_err());
        config.orchestrator.max_concurrency = 21;
        assert!(config.validate().is_err());
        config.orchestrator.max_concurrency = 20;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = base_config();
        config.orchestrator.run_timeout_seconds = 59;
        assert!(config.validate().is_err());
        config.orchestrator.run_timeout_seconds = 3601;
        assert!(config.validate().is_err());
        config.orchestrator.run_timeout_seconds = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_buffer_bounds() {
        let mut config = base_config();
        config.orchestrator.log_buffer_cap = 99;
        assert!(config.validate().is_err());
        config.orchestrator.log_buffer_cap = 10_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_pipeline_command_rejected() {
        let mut config = base_config();
        config.pipeline.command.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_production_requires_secret() {
        let mut config = base_config();
        config.auth.production = true;
        config.auth.api_secret = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_production_rejects_weak_secrets() {
        let mut config = base_config();
        config.auth.production = true;

        config.auth.api_secret = Some("changeme".to_string());
        assert!(config.validate().is_err());

        // Too short
        config.auth.api_secret = Some("abcd1234".to_string());
        assert!(config.validate().is_err());

        // Long but too few distinct characters
        config.auth.api_secret = Some("aaaabbbbaaaabbbb".to_string());
        assert!(config.validate().is_err());

        config.auth.api_secret = Some("x7Kq-9fLm2P-wzR8tV".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dev_mode_allows_missing_secret() {
        let mut config = base_config();
        config.auth.production = false;
        config.auth.api_secret = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override_host() {
        env::set_var("APPLYFLOW_SERVER_HOST", "0.0.0.0");
        let mut config = base_config();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        env::remove_var("APPLYFLOW_SERVER_HOST");
    }

    #[test]
    fn test_env_override_port() {
        env::set_var("APPLYFLOW_SERVER_PORT", "9090");
        let mut config = base_config();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.server.port, 9090);
        env::remove_var("APPLYFLOW_SERVER_PORT");
    }

    #[test]
    fn test_env_override_invalid_port_fails() {
        env::set_var("APPLYFLOW_SERVER_PORT", "notaport");
        let mut config = base_config();
        assert!(config.apply_env_overrides().is_err());
        env::remove_var("APPLYFLOW_SERVER_PORT");
    }

    #[test]
    fn test_env_override_secret() {
        env::set_var("APPLYFLOW_API_SECRET", "from-environment-value");
        let mut config = base_config();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.auth.api_secret.as_deref(), Some("from-environment-value"));
        env::remove_var("APPLYFLOW_API_SECRET");
    }

    #[test]
    fn test_env_override_max_concurrency() {
        env::set_var("APPLYFLOW_MAX_CONCURRENCY", "7");
        let mut config = base_config();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.orchestrator.max_concurrency, 7);
        env::remove_var("APPLYFLOW_MAX_CONCURRENCY");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("ab"), "****");
        assert_eq!(mask_secret("abcdefgh"), "abcd****");
    }

    #[test]
    fn test_redact_authority() {
        assert_eq!(redact_authority("http://user:pw@host:9000"), "http://***@host:9000");
        assert_eq!(redact_authority("host:9000"), "host:9000");
    }

    #[test]
    fn test_from_toml_defaults() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [pipeline]
            command = ["python3", "pipeline/main.py"]
            output_dir = "./data/output"

            [logging]
            file_path = "./logs/applyflow.log"
        "#;
        let config: OrchestratorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.orchestrator.max_concurrency, 3);
        assert_eq!(config.orchestrator.run_timeout_seconds, 900);
        assert!(config.storage.enabled);
        assert!(!config.auth.production);
        assert!(config.validate().is_ok());
    }
}
