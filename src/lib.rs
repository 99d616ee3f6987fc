//! # eai-agent
//!
//! An autonomous coding-agent runtime: a supervisor loop drives a model
//! through think/act/observe cycles against a host filesystem, parsing
//! tool calls out of free-form text and gating risky ones behind human
//! approval.
//!
//! ## Architecture
//!
//! - **Agent** (`agent`): the supervisor loop, completion/truncation/
//!   HTML-salvage/verification helpers, and the core data model
//! - **Tool Engine** (`tools`): the nine canonical tools plus timing,
//!   truncation, and redaction policy
//! - **Tool-Call Parser** (`parser`): seven-tactic extraction of tool
//!   calls from arbitrary model text
//! - **Model Provider** (`model`): the external LLM boundary
//! - **Path Resolver** (`pathres`): working-root-relative path
//!   resolution and containment checks
//! - **Permission Gate** (`permission`): risky-call classification and
//!   human-approval channel
//! - **Prompt Assembler** (`prompt`): budget-bounded transcript
//!   flattening
//! - **Progress Emitter** (`progress`): structured observability events
//! - **Redactor** (`redact`): secret-stripping for every outbound string
//! - **Coordination Store** (`coordination`): a run-scoped multi-agent
//!   bus with poll cursors and scope claims, backed by Postgres
//! - **Configuration** (`config`): modular, env/file-driven settings

pub mod agent;

#[path = "config/mod.rs"]
pub mod config;

pub mod coordination;
pub mod error;
pub mod model;
pub mod parser;
pub mod pathres;
pub mod permission;
pub mod progress;
pub mod prompt;
pub mod redact;
pub mod tools;

pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
