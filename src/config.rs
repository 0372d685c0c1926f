use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Tracking service configuration
    pub tracking: TrackingConfig,

    /// AutoML search defaults
    pub automl: AutoMlConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and
    /// the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: XSELL)
            .add_source(
                config::Environment::with_prefix("XSELL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tracking: TrackingConfig::default(),
            automl: AutoMlConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Connection settings for the MLflow-compatible tracking service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Base URI of the tracking server
    #[serde(default = "default_tracking_uri")]
    pub uri: String,

    /// Experiment namespace for training runs
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,

    /// Artifact location passed when the experiment has to be created
    #[serde(default = "default_artifact_location")]
    pub artifact_location: String,

    /// Timeout for tracking API calls (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            uri: default_tracking_uri(),
            experiment_name: default_experiment_name(),
            artifact_location: default_artifact_location(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Defaults applied when a training request omits a parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoMlConfig {
    /// Target column name
    #[serde(default = "default_target")]
    pub default_target: String,

    /// Upper bound on trained candidates
    #[serde(default = "default_max_models")]
    pub default_max_models: usize,

    /// Comma-separated algorithm families excluded from the search
    #[serde(default = "default_exclude_algos")]
    pub default_exclude_algos: String,

    /// Seed for the train/validation shuffle
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Fraction of rows held out for candidate scoring
    #[serde(default = "default_validation_split")]
    pub validation_split: f64,
}

impl Default for AutoMlConfig {
    fn default() -> Self {
        Self {
            default_target: default_target(),
            default_max_models: default_max_models(),
            default_exclude_algos: default_exclude_algos(),
            seed: default_seed(),
            validation_split: default_validation_split(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_tracking_uri() -> String {
    "http://mlflow:5000".to_string()
}

fn default_experiment_name() -> String {
    "demomlops3-insurance-cross-sell".to_string()
}

fn default_artifact_location() -> String {
    "mlflow-artifacts:/".to_string()
}

fn default_target() -> String {
    "Response".to_string()
}

fn default_max_models() -> usize {
    5
}

fn default_exclude_algos() -> String {
    "GLM,DRF".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_validation_split() -> f64 {
    0.2
}

fn default_log_level() -> String {
    "info".to_string()
}
