//! Configuration paths.
//!
//! Utilities for resolving configuration file paths.

use std::path::PathBuf;

/// Get the configuration directory.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("EAI_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    dirs::config_dir()
        .map(|d| d.join("eai-agent"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".config").join("eai-agent"))
                .unwrap_or_else(|| PathBuf::from(".eai-agent"))
        })
}

/// Get the main configuration file path.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("EAI_CONFIG") {
        return PathBuf::from(path);
    }

    config_dir().join("config.json")
}

/// Get the working directory: `EAI_WORKDIR`, then `/app` if present, then the
/// current directory.
pub fn workspace_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("EAI_WORKDIR") {
        return PathBuf::from(dir);
    }
    let app_dir = PathBuf::from("/app");
    if app_dir.is_dir() {
        return app_dir;
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Get the directory persisted `AgentState` snapshots are written to.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("EAI_STATE_DIR") {
        return PathBuf::from(dir);
    }

    dirs::data_dir()
        .map(|d| d.join("eai-agent"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local").join("share").join("eai-agent"))
                .unwrap_or_else(|| PathBuf::from(".eai-agent"))
        })
}

/// Ensure a directory exists.
pub fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let _ = config_dir();
        let _ = config_path();
        let _ = state_dir();
        let _ = workspace_dir();
    }
}
