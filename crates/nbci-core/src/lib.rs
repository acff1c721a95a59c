//! nbci core - shared domain types for the notebook CI toolkit.
//!
//! Provides:
//! - `PipelineConfig`: the immutable per-run configuration struct
//! - `RepoProfile`: the data-driven repository-specific behavior table
//! - `RunReport`: the structured (stage, severity, message) ledger
//! - Git and notebook-discovery helpers shared by the pipeline and the
//!   standalone workflow tools

pub mod config;
pub mod error;
pub mod git;
pub mod notebooks;
pub mod profile;
pub mod report;
pub mod telemetry;

pub use config::{ExecutionMode, PipelineConfig};
pub use error::{NbciError, Result};
pub use profile::{repo_profile, RepoProfile};
pub use report::{RunReport, Severity, Stage, StageRecord, StageStatus};
pub use telemetry::init_tracing;
