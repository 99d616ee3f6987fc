//! Configuration types module.
//!
//! Re-exports all configuration types, split by concern the way openclaw
//! does it: each external boundary (model provider, tool engine,
//! coordination store) gets its own file under `types/`.

pub mod coordination;
pub mod provider;
pub mod tool_engine;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Agent-level configuration (workspace, model, loop bounds).
    #[serde(default)]
    pub agent: AgentConfig,

    /// Model provider configuration.
    #[serde(default)]
    pub provider: provider::ProviderConfig,

    /// Tool-engine tuning configuration.
    #[serde(default)]
    pub tools: tool_engine::ToolEngineConfig,

    /// Coordination store configuration.
    #[serde(default)]
    pub coordination: coordination::CoordinationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            agent: AgentConfig::default(),
            provider: provider::ProviderConfig::default(),
            tools: tool_engine::ToolEngineConfig::default(),
            coordination: coordination::CoordinationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and files.
    ///
    /// Loads, in order: defaults, a config file if present, then
    /// environment variable overrides.
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Agent-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Working directory the agent is allowed to read and write within.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
    /// Upper bound on loop iterations before giving up without completion.
    #[serde(default = "default_max_loops")]
    pub max_loops: u32,
    /// Run indefinitely instead of stopping at `max_loops`.
    #[serde(default)]
    pub relentless: bool,
    /// Directory persisted `AgentState` snapshots are written to.
    pub state_dir: Option<PathBuf>,
    /// Allow tool calls outside the working directory and skip permission prompts.
    #[serde(default)]
    pub dangerously_full_access: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            workspace: default_workspace(),
            max_loops: default_max_loops(),
            relentless: false,
            state_dir: None,
            dangerously_full_access: false,
        }
    }
}

fn default_workspace() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_max_loops() -> u32 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.agent.max_loops, 50);
        assert!(!config.agent.relentless);
    }
}
