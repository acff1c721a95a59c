//! Pipeline orchestration.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::info;

use nbci_core::{repo_profile, PipelineConfig, Result, RunReport};

use crate::runner::CommandRunner;
use crate::{deps, docs, execute, provision, security, validate};

/// Result of a complete local CI run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Structured record ledger and per-stage statuses.
    pub report: RunReport,

    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Exit code for the process: nonzero iff the ledger holds errors.
    pub fn exit_code(&self) -> i32 {
        self.report.exit_code()
    }
}

/// Sequential local CI pipeline.
pub struct LocalCiPipeline;

impl LocalCiPipeline {
    /// Run all stages in order against one repository.
    ///
    /// Fatal conditions (missing tools, failed provisioning or core
    /// installs, unknown single-notebook path, failed documentation
    /// build) propagate as `Err` immediately; everything else lands on
    /// the report and the pipeline keeps going.
    pub async fn run(
        config: &PipelineConfig,
        runner: &dyn CommandRunner,
    ) -> Result<PipelineResult> {
        let start = Instant::now();
        let mut report = RunReport::new(config.digest());
        let profile = repo_profile(&config.repo_name());
        let mut env: BTreeMap<String, String> = config.base_env();

        info!(
            run_id = %report.run_id,
            repo = %config.repo_name(),
            mode = %config.execution_mode,
            "starting local CI pipeline"
        );

        provision::run(config, runner, &mut report).await?;
        deps::run(config, profile, runner, &mut report, &mut env).await?;
        validate::run(config, runner, &mut report, &env).await?;
        execute::run(config, runner, &mut report, &env).await?;
        security::run(config, profile, runner, &mut report, &env).await?;
        docs::run(config, runner, &mut report, &env).await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %report.run_id,
            duration_ms,
            warnings = report.warnings().count(),
            "local CI pipeline finished"
        );

        Ok(PipelineResult {
            report,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbci_core::{Severity, Stage};

    #[test]
    fn test_result_exit_code_reduction() {
        let mut report = RunReport::new("d".into());
        report.warn(Stage::Validation, "advisory");
        let result = PipelineResult {
            report,
            duration_ms: 10,
        };
        assert_eq!(result.exit_code(), 0);

        let mut report = RunReport::new("d".into());
        report.error(Stage::Documentation, "hard failure");
        let result = PipelineResult {
            report,
            duration_ms: 10,
        };
        assert_eq!(result.exit_code(), 1);
        assert!(result
            .report
            .records
            .iter()
            .any(|r| r.severity == Severity::Error));
    }
}
