//! Documentation build stage.
//!
//! Only runs when both jupyter-book config files are present; with partial
//! config the stage is a silent skip. Once a build is actually requested,
//! a failing invocation or a missing HTML output tree is fatal; the tool
//! is known to no-op silently on some misconfigurations.

use std::collections::BTreeMap;
use std::path::PathBuf;

use nbci_core::{NbciError, PipelineConfig, Result, RunReport, Stage, StageStatus};

use crate::runner::{CommandRunner, CommandSpec};

/// Fixed output path for local documentation builds.
pub fn build_output_dir() -> PathBuf {
    std::env::temp_dir().join("nbci-docs-build")
}

pub async fn run(
    config: &PipelineConfig,
    runner: &dyn CommandRunner,
    report: &mut RunReport,
    env: &BTreeMap<String, String>,
) -> Result<()> {
    if !config.build_documentation {
        report.info(Stage::Documentation, "documentation build disabled by configuration");
        report.set_status(Stage::Documentation, StageStatus::Skipped);
        return Ok(());
    }

    let book_config = config.workdir.join("_config.yml");
    let book_toc = config.workdir.join("_toc.yml");
    if !book_config.is_file() || !book_toc.is_file() {
        report.warn(
            Stage::Documentation,
            "_config.yml and _toc.yml not both present, skipping documentation build",
        );
        report.set_status(Stage::Documentation, StageStatus::Skipped);
        return Ok(());
    }

    let out = build_output_dir();
    let build = CommandSpec::new(
        config.venv_bin("jupyter-book").display().to_string(),
        &config.workdir,
    )
    .args(["build", "."])
    .args(["--path-output".to_string(), out.display().to_string()])
    .envs(env);

    let outcome = runner.run(&build).await;
    if !outcome.success() {
        report.error(Stage::Documentation, "jupyter-book build failed");
        report.set_status(Stage::Documentation, StageStatus::Failed);
        return Err(NbciError::DocsBuildFailed(format!(
            "jupyter-book exited {}: {}",
            outcome.exit_code,
            outcome.stderr.trim()
        )));
    }

    let html = out.join("_build").join("html");
    if !html.is_dir() {
        report.error(Stage::Documentation, "build produced no _build/html output");
        report.set_status(Stage::Documentation, StageStatus::Failed);
        return Err(NbciError::DocsBuildFailed(format!(
            "expected output directory missing: {}",
            html.display()
        )));
    }

    report.info(Stage::Documentation, format!("documentation built at {}", html.display()));
    report.set_status(Stage::Documentation, StageStatus::Passed);
    Ok(())
}
