//! Configuration I/O — loading and saving configuration.
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use secrecy::SecretString;

use super::types::Config;
use crate::error::{Error, Result};

/// A snapshot of the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    /// Path to the config file.
    pub path: std::path::PathBuf,
    /// Whether the file exists.
    pub exists: bool,
    /// Raw file content.
    pub raw: Option<String>,
    /// Parsed configuration.
    pub config: Option<Config>,
    /// Validation issues.
    pub issues: Vec<String>,
}

/// Load configuration from the default path, falling back to environment
/// variables when no config file is present.
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load configuration from a specific path.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

    let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply the recognized environment variables over a loaded config,
/// in place. `.env` is loaded first if present.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();

    config.agent.workspace = super::paths::workspace_dir();

    if let Some(dir) = std::env::var("EAI_STATE_DIR").ok().map(std::path::PathBuf::from) {
        config.agent.state_dir = Some(dir);
    }

    if let Ok(max_loops) = std::env::var("EAI_MAX_LOOPS") {
        if let Ok(parsed) = max_loops.parse() {
            config.agent.max_loops = parsed;
        }
    }
    if let Ok(relentless) = std::env::var("EAI_RELENTLESS") {
        config.agent.relentless = relentless == "true" || relentless == "1";
    }

    if let Ok(api_key) = std::env::var("EAI_API_KEY").or_else(|_| std::env::var("MINIMAX_API_KEY")) {
        let mut openrouter = config.provider.openrouter.take().unwrap_or_else(|| super::types::provider::OpenRouterConfig {
            api_key: SecretString::from(String::new()),
            default_model: "anthropic/claude-3.5-sonnet".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            site_url: None,
            site_name: None,
            timeout_secs: 120,
        });
        openrouter.api_key = SecretString::from(api_key);
        if let Ok(model) = std::env::var("EAI_MODEL") {
            openrouter.default_model = model;
        }
        config.provider.openrouter = Some(openrouter);
    }

    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        config.coordination.postgres = Some(super::types::coordination::PostgresConfig {
            url: SecretString::from(database_url),
            max_connections: std::env::var("EAI_DB_MAX_CONNECTIONS").ok().and_then(|s| s.parse().ok()).unwrap_or(5),
            connect_timeout_secs: std::env::var("EAI_DB_CONNECT_TIMEOUT").ok().and_then(|s| s.parse().ok()).unwrap_or(30),
        });
    }

    let tools = &mut config.tools;
    if let Ok(v) = std::env::var("EAI_DEFAULT_TIMEOUT") {
        if let Ok(parsed) = v.parse() {
            tools.default_timeout_secs = parsed;
        }
    }
    if let Ok(v) = std::env::var("EAI_MAX_OUTPUT_BUFFER_SIZE") {
        if let Ok(parsed) = v.parse() {
            tools.max_output_buffer_size = parsed;
        }
    }
    if let Ok(v) = std::env::var("EAI_MAX_HTTP_RESPONSE_SIZE") {
        if let Ok(parsed) = v.parse() {
            tools.max_http_response_size = parsed;
        }
    }
    if let Ok(v) = std::env::var("EAI_CONTEXT_SUMMARIZE_THRESHOLD") {
        if let Ok(parsed) = v.parse() {
            tools.context_summarize_threshold = parsed;
        }
    }
    if let Ok(v) = std::env::var("EAI_MAX_RETRIES") {
        if let Ok(parsed) = v.parse() {
            tools.max_retries = parsed;
        }
    }
    if let Ok(v) = std::env::var("EAI_RETRY_DELAY") {
        if let Ok(parsed) = v.parse() {
            tools.retry_delay_secs = parsed;
        }
    }
}

/// Save configuration to a file.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

/// Read a configuration file into a snapshot.
#[allow(dead_code)]
pub fn read_config_snapshot(path: &Path) -> ConfigSnapshot {
    if !path.exists() {
        return ConfigSnapshot {
            path: path.to_path_buf(),
            exists: false,
            raw: None,
            config: None,
            issues: vec!["Configuration file does not exist".to_string()],
        };
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            return ConfigSnapshot {
                path: path.to_path_buf(),
                exists: true,
                raw: None,
                config: None,
                issues: vec![format!("Failed to read file: {}", e)],
            };
        }
    };

    let config = match load_config_from_path(path) {
        Ok(config) => Some(config),
        Err(e) => {
            return ConfigSnapshot {
                path: path.to_path_buf(),
                exists: true,
                raw: Some(raw),
                config: None,
                issues: vec![format!("Failed to parse config: {}", e)],
            };
        }
    };

    ConfigSnapshot { path: path.to_path_buf(), exists: true, raw: Some(raw), config, issues: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_config.json");

        let config = Config::default();
        save_config(&config, &path).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.agent.max_loops, config.agent.max_loops);
    }

    #[test]
    fn env_overrides_pick_up_api_key() {
        std::env::set_var("EAI_API_KEY", "test-key-for-config-io");
        let mut config = Config::default();
        apply_env_overrides(&mut config);
        assert!(config.provider.openrouter.is_some());
        std::env::remove_var("EAI_API_KEY");
    }
}
