//! Application configuration loaded from environment variables.

use crate::layout::LayoutConfig;
use crate::services::DeploymentSettings;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev-secret-do-not-use-in-production-change-me-now";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
    #[error("JWT_SECRET environment variable is required in production")]
    MissingJwtSecret,
    #[error("JWT_SECRET must be at least 32 characters in production")]
    WeakJwtSecret,
    #[error("Failed to load layout config: {0}")]
    Layout(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Settings read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Enables PostgreSQL storage when set
    pub database_url: Option<String>,
    /// Enables the HTTP provider gateway when set
    pub provider_url: Option<String>,
    pub provider_token: Option<String>,
    pub provider_timeout: Duration,
    pub deploy_workers: usize,
    pub lane_idle: Duration,
    pub status_history_limit: usize,
    pub stack_name_prefix: String,
    pub layout_config_path: Option<PathBuf>,
    pub log_format: LogFormat,
    pub jwt_secret: String,
    pub is_development: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "production".to_string());
        let is_development = app_env.to_lowercase() == "development";

        let jwt_secret = match non_empty("JWT_SECRET") {
            Some(secret) => {
                if secret.len() < 32 {
                    if !is_development {
                        return Err(ConfigError::WeakJwtSecret);
                    }
                    warn!("JWT_SECRET is less than 32 characters. Consider using a longer secret.");
                }
                secret
            }
            None if is_development => {
                warn!("JWT_SECRET not set! Using default secret for development. DO NOT USE IN PRODUCTION!");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::MissingJwtSecret),
        };

        let log_format = match non_empty("LOG_FORMAT").map(|v| v.to_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) if v == "text" => LogFormat::Text,
            Some(value) => {
                return Err(ConfigError::InvalidValue {
                    name: "LOG_FORMAT",
                    value,
                });
            }
            None => LogFormat::Text,
        };

        Ok(Self {
            port: parse_or("PORT", 8081)?,
            database_url: non_empty("DATABASE_URL"),
            provider_url: non_empty("PROVIDER_URL"),
            provider_token: non_empty("PROVIDER_TOKEN"),
            provider_timeout: Duration::from_secs(parse_or("PROVIDER_TIMEOUT_SECS", 900)?),
            deploy_workers: parse_or::<usize>("DEPLOY_WORKERS", 4)?.max(1),
            lane_idle: Duration::from_secs(parse_or("DEPLOY_LANE_IDLE_SECS", 30)?),
            status_history_limit: parse_or::<usize>("STATUS_HISTORY_LIMIT", 20)?.max(1),
            stack_name_prefix: non_empty("STACK_NAME_PREFIX")
                .unwrap_or_else(|| "topology".to_string()),
            layout_config_path: non_empty("LAYOUT_CONFIG").map(PathBuf::from),
            log_format,
            jwt_secret,
            is_development,
        })
    }

    /// Layout spacing from `LAYOUT_CONFIG`, or the defaults
    pub fn layout_config(&self) -> Result<LayoutConfig, ConfigError> {
        match &self.layout_config_path {
            Some(path) => LayoutConfig::from_yaml_file(path)
                .map_err(|e| ConfigError::Layout(format!("{:#}", e))),
            None => Ok(LayoutConfig::default()),
        }
    }

    pub fn deployment_settings(&self, layout: LayoutConfig) -> DeploymentSettings {
        DeploymentSettings {
            workers: self.deploy_workers,
            lane_idle: self.lane_idle,
            history_limit: self.status_history_limit,
            stack_name_prefix: self.stack_name_prefix.clone(),
            layout,
        }
    }
}

/// Read the log format alone, before the rest of the config is validated
pub fn log_format_from_env() -> LogFormat {
    match env::var("LOG_FORMAT") {
        Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}
