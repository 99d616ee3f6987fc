//! Tool Engine tuning configuration.

use serde::{Deserialize, Serialize};

/// Tool-engine tuning knobs, all overridable via environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEngineConfig {
    /// `exec` command timeout in seconds, absent an explicit `timeout_s` arg.
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,
    /// Maximum bytes of tool output kept before tail-truncation.
    #[serde(default = "default_max_output")]
    pub max_output_buffer_size: usize,
    /// Maximum bytes read from an HTTP response a tool fetches.
    #[serde(default = "default_max_http_response")]
    pub max_http_response_size: usize,
    /// Transcript size, in bytes, past which the Prompt Assembler starts summarizing.
    #[serde(default = "default_context_summarize_threshold")]
    pub context_summarize_threshold: usize,
    /// Maximum retries for a retryable tool or model-provider failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay in seconds between retries.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for ToolEngineConfig {
    fn default() -> Self {
        ToolEngineConfig {
            default_timeout_secs: default_timeout(),
            max_output_buffer_size: default_max_output(),
            max_http_response_size: default_max_http_response(),
            context_summarize_threshold: default_context_summarize_threshold(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_output() -> usize {
    1024 * 1024
}

fn default_max_http_response() -> usize {
    5 * 1024 * 1024
}

fn default_context_summarize_threshold() -> usize {
    crate::prompt::DEFAULT_BUDGET_BYTES
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_engine_config_default() {
        let config = ToolEngineConfig::default();
        assert_eq!(config.default_timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
    }
}
