//! Agent module — the supervisor loop driving a model through
//! think/act/observe cycles, plus the pieces feeding it: completion
//! detection, truncation handling, HTML salvage, post-completion
//! verification, and system-prompt assembly.

pub mod completion;
pub mod html_salvage;
pub mod loop_;
pub mod system_prompt;
pub(crate) mod types;
pub mod truncation;
pub mod verify;

pub use loop_::{AgentLoop, CancellationToken, FileStatePersister, LoopConfig, LoopOutcome, NoOpPersister, StatePersister};
pub use types::*;
