//! Tool Engine — modular tool system for agent capabilities.
//!
//! Each tool is a self-contained module implementing the `Tool` trait.
//! A `Tool` handler is intentionally thin: it returns a `RawToolResult`
//! describing what it did, and leaves timing, truncation, and
//! redaction to `ToolEngine`, which wraps the registry.
//!
//! ## Canonical tools
//!
//! `exec`, `read_file`, `write_file`, `edit_file`, `append_file`,
//! `patch_file`, `list_dir`, `grep`, `search_files`.
//!
//! ## Adding a new tool
//!
//! 1. Create a new file in `src/tools/` implementing `Tool`.
//! 2. Add `mod` + registration in `canonical_registry` below.

mod traits;
mod registry;
mod truncate;
mod engine;

mod exec;
mod read_file;
mod write_file;
mod edit_file;
mod append_file;
mod patch_file;
mod list_dir;
mod grep;
mod search_files;

use std::path::PathBuf;

pub use traits::{RawToolResult, Tool};
pub use registry::ToolRegistry;
pub use truncate::{truncate_tail, DEFAULT_MAX_OUTPUT_BYTES};
pub use engine::ToolEngine;

pub use exec::ExecTool;
pub use read_file::ReadFileTool;
pub use write_file::WriteFileTool;
pub use edit_file::EditFileTool;
pub use append_file::AppendFileTool;
pub use patch_file::PatchFileTool;
pub use list_dir::ListDirTool;
pub use grep::GrepTool;
pub use search_files::SearchFilesTool;

/// Build the registry holding all nine canonical tools. `_workspace` is
/// accepted for callers that want to pre-validate or log the working
/// root; the tools themselves take their root from the `PathResolver`
/// passed at execution time, not from here.
pub fn canonical_registry(_workspace: PathBuf) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(ExecTool::new());
    registry.register(ReadFileTool::new());
    registry.register(WriteFileTool::new());
    registry.register(EditFileTool::new());
    registry.register(AppendFileTool::new());
    registry.register(PatchFileTool::new());
    registry.register(ListDirTool::new());
    registry.register(GrepTool::new());
    registry.register(SearchFilesTool::new());
    registry
}

/// Same as `canonical_registry`, but wires `exec` for
/// "dangerously-full-access" mode (sudo/docker-group retries enabled).
pub fn canonical_registry_dangerous(_workspace: PathBuf) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(ExecTool::new().with_dangerous_mode(true));
    registry.register(ReadFileTool::new());
    registry.register(WriteFileTool::new());
    registry.register(EditFileTool::new());
    registry.register(AppendFileTool::new());
    registry.register(PatchFileTool::new());
    registry.register(ListDirTool::new());
    registry.register(GrepTool::new());
    registry.register(SearchFilesTool::new());
    registry
}
