//! Model provider configuration types.
//!
//! Configuration for the OpenRouter-backed model provider
//! "Model provider" external interface).

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenRouter configuration, if a provider has been configured for this run.
    pub openrouter: Option<OpenRouterConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig { openrouter: None }
    }
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// OpenRouter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// API key. Accepted from either `EAI_API_KEY` or `MINIMAX_API_KEY`.
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Default model.
    #[serde(default = "default_openrouter_model")]
    pub default_model: String,
    /// Base URL.
    #[serde(default = "default_openrouter_url")]
    pub base_url: String,
    /// Site URL for OpenRouter rankings.
    pub site_url: Option<String>,
    /// Site name for OpenRouter rankings.
    pub site_name: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_openrouter_model() -> String {
    "anthropic/claude-3.5-sonnet".to_string()
}

fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_timeout() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_default_has_no_provider() {
        let config = ProviderConfig::default();
        assert!(config.openrouter.is_none());
    }
}
