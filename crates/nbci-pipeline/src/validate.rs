//! Notebook validation stage.
//!
//! Runs nbval through pytest against either a single configured notebook
//! or the whole notebooks tree. Validation never mutates the notebooks;
//! failures are recorded and the pipeline continues. The only fatal case
//! is an explicitly configured single-notebook path that does not exist.

use std::collections::BTreeMap;

use nbci_core::{notebooks, NbciError, PipelineConfig, Result, RunReport, Stage, StageStatus};

use crate::runner::{CommandRunner, CommandSpec};

pub async fn run(
    config: &PipelineConfig,
    runner: &dyn CommandRunner,
    report: &mut RunReport,
    env: &BTreeMap<String, String>,
) -> Result<()> {
    let target = if let Some(single) = &config.single_notebook {
        if !single.is_file() {
            report.set_status(Stage::Validation, StageStatus::Failed);
            return Err(NbciError::NotebookNotFound(single.display().to_string()));
        }
        single.clone()
    } else {
        let dir = config.notebooks_dir();
        if !dir.is_dir() {
            report.warn(Stage::Validation, "no notebooks/ directory, skipping validation");
            report.set_status(Stage::Validation, StageStatus::Skipped);
            return Ok(());
        }
        if notebooks::discover(&dir)?.is_empty() {
            report.warn(Stage::Validation, "no notebooks found, skipping validation");
            report.set_status(Stage::Validation, StageStatus::Skipped);
            return Ok(());
        }
        dir
    };

    let spec = CommandSpec::new(
        config.venv_bin("python").display().to_string(),
        &config.workdir,
    )
    .args(["-m", "pytest", "--nbval"])
    .arg(target.display().to_string())
    .envs(env);

    let outcome = runner.run(&spec).await;
    if outcome.success() {
        report.info(Stage::Validation, "notebook validation passed");
        report.set_status(Stage::Validation, StageStatus::Passed);
    } else {
        report.warn(
            Stage::Validation,
            format!("notebook validation failed (exit {})", outcome.exit_code),
        );
        report.set_status(Stage::Validation, StageStatus::Failed);
    }
    Ok(())
}
