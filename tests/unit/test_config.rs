//! Unit tests for layout and application configuration.

use cloud_topology_api::config::{AppConfig, ConfigError, LogFormat};
use cloud_topology_api::layout::LayoutConfig;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;

const CONFIG_VARS: &[&str] = &[
    "APP_ENV",
    "JWT_SECRET",
    "PORT",
    "DATABASE_URL",
    "PROVIDER_URL",
    "PROVIDER_TOKEN",
    "PROVIDER_TIMEOUT_SECS",
    "DEPLOY_WORKERS",
    "DEPLOY_LANE_IDLE_SECS",
    "STATUS_HISTORY_LIMIT",
    "STACK_NAME_PREFIX",
    "LAYOUT_CONFIG",
    "LOG_FORMAT",
];

fn clear_env() {
    for name in CONFIG_VARS {
        unsafe { std::env::remove_var(name) };
    }
}

fn set_env(name: &str, value: &str) {
    unsafe { std::env::set_var(name, value) };
}

#[test]
fn test_layout_yaml_keeps_defaults_for_missing_keys() {
    let config = LayoutConfig::from_yaml_str("padding: 12\nrow_gap: 50\n").unwrap();

    assert_eq!(config.padding, 12.0);
    assert_eq!(config.row_gap, 50.0);
    assert_eq!(config.header_height, LayoutConfig::default().header_height);
}

#[test]
fn test_layout_normalization_repairs_invalid_values() {
    let config = LayoutConfig {
        padding: -5.0,
        exclusive_margin: 30.0,
        container_gap: 10.0,
        min_container_width: f64::NAN,
        ..LayoutConfig::default()
    }
    .normalized();

    assert_eq!(config.padding, 20.0);
    // Gaps never drop below the exclusive margin
    assert_eq!(config.container_gap, 30.0);
    assert_eq!(config.min_container_width, 240.0);
}

#[test]
fn test_layout_yaml_rejects_garbage() {
    assert!(LayoutConfig::from_yaml_str("padding: [1, 2").is_err());
}

#[test]
fn test_layout_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "exclusive_margin: 16\nexternal_gap: 80").unwrap();

    let config = LayoutConfig::from_yaml_file(file.path()).unwrap();

    assert_eq!(config.exclusive_margin, 16.0);
    assert_eq!(config.external_gap, 80.0);
}

#[test]
#[serial]
fn test_app_config_defaults_in_development() {
    clear_env();
    set_env("APP_ENV", "development");

    let config = AppConfig::from_env().unwrap();

    assert_eq!(config.port, 8081);
    assert!(config.database_url.is_none());
    assert!(config.provider_url.is_none());
    assert_eq!(config.provider_timeout, Duration::from_secs(900));
    assert_eq!(config.deploy_workers, 4);
    assert_eq!(config.lane_idle, Duration::from_secs(30));
    assert_eq!(config.status_history_limit, 20);
    assert_eq!(config.stack_name_prefix, "topology");
    assert_eq!(config.log_format, LogFormat::Text);
    assert!(config.is_development);
    assert!(!config.jwt_secret.is_empty());
    clear_env();
}

#[test]
#[serial]
fn test_app_config_reads_overrides() {
    clear_env();
    set_env("JWT_SECRET", "0123456789abcdef0123456789abcdef");
    set_env("PORT", "9090");
    set_env("PROVIDER_URL", "http://gateway:7000");
    set_env("DEPLOY_WORKERS", "8");
    set_env("STATUS_HISTORY_LIMIT", "5");
    set_env("STACK_NAME_PREFIX", "acme");
    set_env("LOG_FORMAT", "json");

    let config = AppConfig::from_env().unwrap();

    assert_eq!(config.port, 9090);
    assert_eq!(config.provider_url.as_deref(), Some("http://gateway:7000"));
    assert_eq!(config.deploy_workers, 8);
    assert_eq!(config.status_history_limit, 5);
    assert_eq!(config.stack_name_prefix, "acme");
    assert_eq!(config.log_format, LogFormat::Json);
    assert!(!config.is_development);

    let settings = config.deployment_settings(LayoutConfig::default());
    assert_eq!(settings.workers, 8);
    assert_eq!(settings.history_limit, 5);
    clear_env();
}

#[test]
#[serial]
fn test_app_config_requires_secret_in_production() {
    clear_env();

    assert!(matches!(
        AppConfig::from_env(),
        Err(ConfigError::MissingJwtSecret)
    ));

    set_env("JWT_SECRET", "short");
    assert!(matches!(AppConfig::from_env(), Err(ConfigError::WeakJwtSecret)));
    clear_env();
}

#[test]
#[serial]
fn test_app_config_rejects_bad_numbers() {
    clear_env();
    set_env("APP_ENV", "development");
    set_env("DEPLOY_WORKERS", "many");

    let err = AppConfig::from_env().unwrap_err();

    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            name: "DEPLOY_WORKERS",
            ..
        }
    ));
    clear_env();
}

#[test]
#[serial]
fn test_missing_layout_file_is_an_error() {
    clear_env();
    set_env("APP_ENV", "development");
    set_env("LAYOUT_CONFIG", "/nonexistent/layout.yaml");

    let config = AppConfig::from_env().unwrap();

    assert!(matches!(config.layout_config(), Err(ConfigError::Layout(_))));
    clear_env();
}
