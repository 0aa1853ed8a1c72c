// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later tiers win:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::validation::validate_config;
use crate::{BotControlConfig, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "botcontrol.toml";

/// Find the BotControl configuration file
///
/// Search order:
/// 1. `BOTCONTROL_CONFIG_PATH` environment variable
/// 2. Current working directory: `./botcontrol.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("BOTCONTROL_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by BOTCONTROL_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet BOTCONTROL_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the config file is not found, contains invalid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<BotControlConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: BotControlConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    validate_config(&config)?;
    Ok(config)
}

fn parse_into<T: std::str::FromStr>(value: &str, target: &mut T) {
    if let Ok(parsed) = value.trim().parse::<T>() {
        *target = parsed;
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `BOTCONTROL_HOST` -> `connection.host`
/// - `BOTCONTROL_REQUEST_PORT` -> `connection.request_port`
/// - `BOTCONTROL_PUBLISH_PORT` -> `connection.publish_port`
/// - `BOTCONTROL_SERVER_PORT` -> `server.port`
/// - `BOTCONTROL_QUEUE_CAPACITY` -> `client.queue_capacity`
/// - `BOTCONTROL_RESPONSE_DELAY_MS` -> `server.response_delay_ms`
/// - `BOTCONTROL_LOG_LEVEL` -> `logging.level`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut BotControlConfig) {
    if let Ok(value) = env::var("BOTCONTROL_HOST") {
        config.connection.host = value;
    }
    if let Ok(value) = env::var("BOTCONTROL_REQUEST_PORT") {
        parse_into(&value, &mut config.connection.request_port);
    }
    if let Ok(value) = env::var("BOTCONTROL_PUBLISH_PORT") {
        parse_into(&value, &mut config.connection.publish_port);
    }
    if let Ok(value) = env::var("BOTCONTROL_SERVER_PORT") {
        parse_into(&value, &mut config.server.port);
    }
    if let Ok(value) = env::var("BOTCONTROL_QUEUE_CAPACITY") {
        parse_into(&value, &mut config.client.queue_capacity);
    }
    if let Ok(value) = env::var("BOTCONTROL_RESPONSE_DELAY_MS") {
        parse_into(&value, &mut config.server.response_delay_ms);
    }
    if let Ok(value) = env::var("BOTCONTROL_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of CLI arguments (e.g., `{"host": "10.2.1.1", "request_port": "60000"}`)
///
/// `host` is the robot the client and subscriber connect to; the server and
/// publisher bind to `server_bind_host` and `publisher_bind_host`.
pub fn apply_cli_overrides(config: &mut BotControlConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("host") {
        config.connection.host = value.clone();
    }
    if let Some(value) = cli_args.get("server_bind_host") {
        config.server.bind_host = value.clone();
    }
    if let Some(value) = cli_args.get("publisher_bind_host") {
        config.publisher.bind_host = value.clone();
    }
    if let Some(value) = cli_args.get("request_port") {
        parse_into(value, &mut config.connection.request_port);
    }
    if let Some(value) = cli_args.get("publish_port") {
        parse_into(value, &mut config.connection.publish_port);
    }
    if let Some(value) = cli_args.get("server_port") {
        parse_into(value, &mut config.server.port);
    }
    if let Some(value) = cli_args.get("queue_capacity") {
        parse_into(value, &mut config.client.queue_capacity);
    }
    if let Some(value) = cli_args.get("response_delay_ms") {
        parse_into(value, &mut config.server.response_delay_ms);
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: &[&str] = &[
        "BOTCONTROL_HOST",
        "BOTCONTROL_REQUEST_PORT",
        "BOTCONTROL_PUBLISH_PORT",
        "BOTCONTROL_SERVER_PORT",
        "BOTCONTROL_QUEUE_CAPACITY",
        "BOTCONTROL_RESPONSE_DELAY_MS",
        "BOTCONTROL_LOG_LEVEL",
    ];

    fn clear_override_vars() {
        for var in OVERRIDE_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("BOTCONTROL_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("BOTCONTROL_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("BOTCONTROL_CONFIG_PATH", "/definitely/not/here/botcontrol.toml");
        let result = find_config_file();
        env::remove_var("BOTCONTROL_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[connection]").unwrap();
        writeln!(file, "host = \"10.2.1.1\"").unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "response_delay_ms = 0").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();
        assert_eq!(config.connection.host, "10.2.1.1");
        assert_eq!(config.connection.request_port, 60000);
        assert_eq!(config.server.response_delay_ms, 0);
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        env::set_var("BOTCONTROL_HOST", "10.0.2.2");
        env::set_var("BOTCONTROL_QUEUE_CAPACITY", "3");
        env::set_var("BOTCONTROL_REQUEST_PORT", "not-a-port");

        let mut config = BotControlConfig::default();
        apply_environment_overrides(&mut config);
        clear_override_vars();

        assert_eq!(config.connection.host, "10.0.2.2");
        assert_eq!(config.client.queue_capacity, 3);
        assert_eq!(config.connection.request_port, 60000);
    }

    #[test]
    fn test_cli_overrides_win_over_environment() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        env::set_var("BOTCONTROL_SERVER_PORT", "62000");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        File::create(&config_path).unwrap();

        let mut cli = HashMap::new();
        cli.insert("server_port".to_string(), "63000".to_string());
        let config = load_config(Some(&config_path), Some(&cli));
        clear_override_vars();

        assert_eq!(config.unwrap().server.port, 63000);
    }

    #[test]
    fn test_cli_bind_hosts_leave_connect_host_alone() {
        let mut config = BotControlConfig::default();
        let mut cli = HashMap::new();
        cli.insert("server_bind_host".to_string(), "127.0.0.1".to_string());
        cli.insert("publisher_bind_host".to_string(), "192.168.4.2".to_string());
        apply_cli_overrides(&mut config, &cli);

        assert_eq!(config.server.bind_host, "127.0.0.1");
        assert_eq!(config.publisher.bind_host, "192.168.4.2");
        assert_eq!(config.connection.host, BotControlConfig::default().connection.host);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[client]").unwrap();
        writeln!(file, "queue_capacity = 0").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
