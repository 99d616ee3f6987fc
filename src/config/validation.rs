//! Configuration validation.
//!
//! Validates configuration and reports issues.

use super::types::Config;

/// Result of configuration validation.
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid.
    pub valid: bool,
    /// Validation errors (critical).
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical).
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result.
    pub fn valid() -> Self {
        ConfigValidationResult { valid: true, errors: Vec::new(), warnings: Vec::new() }
    }

    /// Add an error.
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning.
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field.
    pub path: String,
    /// Issue message.
    pub message: String,
    /// Suggested fix.
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue { path: path.into(), message: message.into(), suggestion: None }
    }

    /// Add a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Validate the configuration.
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();
    result = validate_provider_config(config, result);
    result = validate_agent_config(config, result);
    result
}

fn validate_provider_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.provider.openrouter.is_none() {
        result = result.with_warning(
            ValidationIssue::new("provider", "No model provider configured. The agent cannot generate responses.")
                .with_suggestion("Set the EAI_API_KEY or MINIMAX_API_KEY environment variable"),
        );
    }
    result
}

fn validate_agent_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if !config.agent.workspace.exists() {
        result = result.with_warning(
            ValidationIssue::new(
                "agent.workspace",
                format!("Working directory does not exist: {}", config.agent.workspace.display()),
            )
            .with_suggestion("Create the directory or set EAI_WORKDIR to an existing one"),
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = validate_config(&config);
        assert!(result.errors.is_empty());
    }
}
