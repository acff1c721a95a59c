//! nbci workflows - standalone tooling around the CI workflow files.
//!
//! Three tools that operate on a repository's `.github/workflows/`:
//! - `validator`: static checks on each workflow file plus an optional
//!   act dry-run
//! - `migrate`: applies the centralized workflow template set to a
//!   repository, tailored by its profile
//! - `readiness`: advisory 0-10 migration-readiness score
//!
//! plus `act`, a thin harness over the local workflow runner.

pub mod act;
pub mod migrate;
pub mod readiness;
pub mod validator;

pub use act::{run_act, ActOptions};
pub use migrate::{migrate, MigrateOptions, MigrationOutcome};
pub use readiness::{assess, Band, ReadinessReport};
pub use validator::{validate_workflows, ValidatorOptions, WorkflowVerdict};
