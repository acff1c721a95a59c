//! Structured run report.
//!
//! Every stage appends `(stage, severity, message)` records as it runs.
//! The final exit code is an explicit reduction over the ledger (nonzero
//! iff any record reached `Error`), rather than each stage deciding ad hoc
//! whether to abort the process. Recoverable conditions from the pipeline
//! contract are recorded as warnings and never flip the exit code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::notebooks;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Environment,
    Dependencies,
    Validation,
    Execution,
    SecurityScan,
    Documentation,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Environment => "environment",
            Stage::Dependencies => "dependencies",
            Stage::Validation => "validation",
            Stage::Execution => "execution",
            Stage::SecurityScan => "security_scan",
            Stage::Documentation => "documentation",
        }
    }

    pub fn all() -> &'static [Stage] {
        &[
            Stage::Environment,
            Stage::Dependencies,
            Stage::Validation,
            Stage::Execution,
            Stage::SecurityScan,
            Stage::Documentation,
        ]
    }
}

/// Record severity. `Warning` covers every recoverable condition; only
/// `Error` affects the final exit code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub severity: Severity,
    pub message: String,
}

/// Terminal status of a stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Passed,
    Failed,
    Skipped,
}

impl StageStatus {
    fn label(&self) -> &'static str {
        match self {
            StageStatus::Passed => "pass",
            StageStatus::Failed => "FAIL",
            StageStatus::Skipped => "skipped",
        }
    }
}

/// Accumulated report for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id for this run.
    pub run_id: String,

    /// Digest of the configuration the run was started with.
    pub config_digest: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Ledger of everything the stages reported.
    pub records: Vec<StageRecord>,

    /// Terminal status per stage, in completion order.
    pub statuses: Vec<(Stage, StageStatus)>,
}

impl RunReport {
    pub fn new(config_digest: String) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            config_digest,
            started_at: Utc::now(),
            records: Vec::new(),
            statuses: Vec::new(),
        }
    }

    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(stage, Severity::Info, message.into());
    }

    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(stage, Severity::Warning, message.into());
    }

    pub fn error(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(stage, Severity::Error, message.into());
    }

    fn push(&mut self, stage: Stage, severity: Severity, message: String) {
        match severity {
            Severity::Info => tracing::info!(stage = stage.name(), "{message}"),
            Severity::Warning => tracing::warn!(stage = stage.name(), "{message}"),
            Severity::Error => tracing::error!(stage = stage.name(), "{message}"),
        }
        self.records.push(StageRecord {
            stage,
            severity,
            message,
        });
    }

    /// Record the terminal status of a stage (last write wins).
    pub fn set_status(&mut self, stage: Stage, status: StageStatus) {
        if let Some(slot) = self.statuses.iter_mut().find(|(s, _)| *s == stage) {
            slot.1 = status;
        } else {
            self.statuses.push((stage, status));
        }
    }

    pub fn status(&self, stage: Stage) -> Option<StageStatus> {
        self.statuses
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, status)| *status)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &StageRecord> {
        self.records
            .iter()
            .filter(|r| r.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(|r| r.severity == Severity::Error)
    }

    /// Explicit reduction over the ledger: nonzero iff any `Error` record.
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            1
        } else {
            0
        }
    }

    /// Render the human-readable end-of-run summary block.
    ///
    /// Notebook facts (did notebooks exist, which ones are marked failed)
    /// are re-derived from the file system here rather than threaded
    /// through from the stages: the reporter is stateless with respect to
    /// the rest of the pipeline.
    pub fn render_summary(&self, config: &PipelineConfig) -> String {
        let notebooks_dir = config.notebooks_dir();
        let notebooks = notebooks::discover(&notebooks_dir).unwrap_or_default();
        let failed = notebooks::discover_failed(&notebooks_dir).unwrap_or_default();

        let mut out = String::new();
        out.push_str("==================================================\n");
        out.push_str("Local CI summary\n");
        out.push_str("==================================================\n");
        out.push_str(&format!("Repository:     {}\n", config.repo_name()));
        out.push_str(&format!("Execution mode: {}\n", config.execution_mode));
        out.push_str(&format!("Run id:         {}\n", self.run_id));
        out.push_str(&format!(
            "Config digest:  {}\n",
            &self.config_digest[..self.config_digest.len().min(12)]
        ));
        out.push_str(&format!(
            "Notebooks:      {} discovered under {}\n",
            notebooks.len(),
            notebooks_dir.display()
        ));
        out.push('\n');

        for stage in Stage::all() {
            let label = self
                .status(*stage)
                .map(|s| s.label())
                .unwrap_or("not run");
            out.push_str(&format!("  {:<14} {}\n", stage.name(), label));
        }

        let warning_count = self.warnings().count();
        if warning_count > 0 {
            out.push('\n');
            out.push_str(&format!("Warnings ({warning_count}):\n"));
            for record in self.warnings() {
                out.push_str(&format!("  [{}] {}\n", record.stage.name(), record.message));
            }
        }

        if !failed.is_empty() {
            out.push('\n');
            out.push_str("Failed notebooks (investigate and remove the markers):\n");
            for path in &failed {
                out.push_str(&format!("  {}\n", path.display()));
            }
        }

        out.push_str("==================================================\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report() -> RunReport {
        RunReport::new("deadbeefdeadbeef".to_string())
    }

    #[test]
    fn test_exit_code_zero_with_warnings_only() {
        let mut r = report();
        r.info(Stage::Environment, "venv reused");
        r.warn(Stage::Validation, "notebook a.ipynb failed validation");
        assert_eq!(r.exit_code(), 0);
        assert!(!r.has_errors());
    }

    #[test]
    fn test_exit_code_nonzero_with_error() {
        let mut r = report();
        r.error(Stage::Documentation, "jupyter-book exited nonzero");
        assert_eq!(r.exit_code(), 1);
    }

    #[test]
    fn test_status_last_write_wins() {
        let mut r = report();
        r.set_status(Stage::Execution, StageStatus::Passed);
        r.set_status(Stage::Execution, StageStatus::Failed);
        assert_eq!(r.status(Stage::Execution), Some(StageStatus::Failed));
    }

    #[test]
    fn test_summary_lists_failed_notebooks() {
        let dir = tempfile::tempdir().unwrap();
        let nb_dir = dir.path().join("notebooks");
        std::fs::create_dir_all(&nb_dir).unwrap();
        std::fs::write(nb_dir.join("a.ipynb"), "{}").unwrap();
        std::fs::write(nb_dir.join("b_failed.ipynb"), "{}").unwrap();

        let config = PipelineConfig::new(dir.path().to_path_buf());
        let mut r = report();
        r.set_status(Stage::Execution, StageStatus::Failed);

        let summary = r.render_summary(&config);
        assert!(summary.contains("1 discovered"));
        assert!(summary.contains("b_failed.ipynb"));
        assert!(summary.contains("execution"));
        assert!(summary.contains("FAIL"));
    }

    #[test]
    fn test_summary_without_notebooks_dir() {
        let config = PipelineConfig::new(PathBuf::from("/nonexistent"));
        let summary = report().render_summary(&config);
        assert!(summary.contains("0 discovered"));
    }
}
