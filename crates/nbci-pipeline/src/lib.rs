//! nbci pipeline - local simulation of the notebook CI workflow.
//!
//! Runs the same stages the GitHub Actions pipeline runs, locally and
//! sequentially: environment provisioning, dependency install, notebook
//! validation, notebook execution, security scan, documentation build,
//! and a final summary. Stage failure policy follows the two-tier model:
//! a small set of hard-fail conditions abort the run, everything else is
//! recorded on the report and the pipeline keeps going.

pub mod deps;
pub mod docs;
pub mod execute;
pub mod fakes;
pub mod pipeline;
pub mod provision;
pub mod runner;
pub mod security;
pub mod validate;

pub use pipeline::{LocalCiPipeline, PipelineResult};
pub use runner::{CommandOutcome, CommandRunner, CommandSpec, ProcessRunner};
