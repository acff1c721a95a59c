//! Notebook execution stage.
//!
//! Re-executes notebooks in place according to the execution mode. A
//! notebook that fails or times out is marked by a best-effort copy to
//! `<stem>_failed.ipynb`; nbconvert only rewrites the original on
//! success, so the marker is a byte-identical copy of the pre-run file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use nbci_core::{
    notebooks, ExecutionMode, NbciError, PipelineConfig, Result, RunReport, Stage, StageStatus,
};

use crate::runner::{CommandRunner, CommandSpec};

/// Per-notebook execution timeout.
const NOTEBOOK_TIMEOUT_SECS: u64 = 300;

/// Number of notebooks the quick smoke-test mode runs.
const QUICK_MODE_COUNT: usize = 3;

pub async fn run(
    config: &PipelineConfig,
    runner: &dyn CommandRunner,
    report: &mut RunReport,
    env: &BTreeMap<String, String>,
) -> Result<()> {
    let selected = match select(config, report)? {
        Some(notebooks) => notebooks,
        None => return Ok(()),
    };

    let mut failures = 0usize;
    for notebook in &selected {
        let spec = CommandSpec::new(
            config.venv_bin("jupyter").display().to_string(),
            &config.workdir,
        )
        .args(["nbconvert", "--to", "notebook", "--execute", "--inplace"])
        .arg(notebook.display().to_string())
        .envs(env)
        .timeout_secs(NOTEBOOK_TIMEOUT_SECS);

        let outcome = runner.run(&spec).await;
        if outcome.success() {
            report.info(Stage::Execution, format!("executed {}", notebook.display()));
        } else {
            failures += 1;
            let reason = if outcome.timed_out {
                "timed out".to_string()
            } else {
                format!("exit {}", outcome.exit_code)
            };
            report.warn(
                Stage::Execution,
                format!("execution of {} failed ({reason})", notebook.display()),
            );
            // Best-effort failure marker; a copy error changes nothing.
            let _ = std::fs::copy(notebook, notebooks::failed_marker_path(notebook));
        }
    }

    let status = if failures == 0 {
        StageStatus::Passed
    } else {
        StageStatus::Failed
    };
    report.set_status(Stage::Execution, status);
    Ok(())
}

/// Resolve the notebook selection for this run; `None` means the stage is
/// a no-op (validation-only mode, or nothing to execute).
fn select(config: &PipelineConfig, report: &mut RunReport) -> Result<Option<Vec<PathBuf>>> {
    // Validation-only never executes, even with a single-notebook
    // override; the override narrows validation and any executing mode.
    if config.execution_mode == ExecutionMode::ValidationOnly {
        report.info(Stage::Execution, "validation-only mode, not executing notebooks");
        report.set_status(Stage::Execution, StageStatus::Skipped);
        return Ok(None);
    }

    if let Some(single) = &config.single_notebook {
        if !single.is_file() {
            report.set_status(Stage::Execution, StageStatus::Failed);
            return Err(NbciError::NotebookNotFound(single.display().to_string()));
        }
        return Ok(Some(vec![single.clone()]));
    }

    let dir = config.notebooks_dir();
    if !dir.is_dir() {
        report.warn(Stage::Execution, "no notebooks/ directory, skipping execution");
        report.set_status(Stage::Execution, StageStatus::Skipped);
        return Ok(None);
    }

    let mut found = notebooks::discover(&dir)?;
    if found.is_empty() {
        report.warn(Stage::Execution, "no notebooks found, skipping execution");
        report.set_status(Stage::Execution, StageStatus::Skipped);
        return Ok(None);
    }

    if config.execution_mode == ExecutionMode::Quick {
        found.truncate(QUICK_MODE_COUNT);
    }
    Ok(Some(found))
}
