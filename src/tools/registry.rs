//! Tool registry - the fixed set of tools allowed for a run.

use std::collections::HashMap;

use crate::agent::types::ToolDefinition;

use super::traits::Tool;

/// Registry of available tools. Determines the allowed set per run
/// (the tool schema).
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::canonical_registry;

    #[test]
    fn canonical_registry_has_all_nine_tools() {
        let registry = canonical_registry(std::path::PathBuf::from("/tmp"));
        for name in [
            "exec",
            "read_file",
            "write_file",
            "edit_file",
            "append_file",
            "patch_file",
            "list_dir",
            "grep",
            "search_files",
        ] {
            assert!(registry.contains(name), "missing tool {name}");
        }
        assert_eq!(registry.count(), 9);
    }
}
