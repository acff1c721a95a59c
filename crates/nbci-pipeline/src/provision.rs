//! Environment provisioning stage.
//!
//! Hard-fail territory: a missing interpreter or version-control tool, a
//! directory outside a git work tree, or a failed accelerant install all
//! abort the run before any later stage touches a notebook.

use nbci_core::{git, NbciError, PipelineConfig, Result, RunReport, Stage, StageStatus};

use crate::runner::{CommandRunner, CommandSpec};

/// Timeout for venv creation and the uv accelerant install.
const PROVISION_TIMEOUT_SECS: u64 = 300;

pub async fn run(
    config: &PipelineConfig,
    runner: &dyn CommandRunner,
    report: &mut RunReport,
) -> Result<()> {
    for tool in ["python3", "git"] {
        let probe = CommandSpec::new(tool, &config.workdir).arg("--version");
        if !runner.run(&probe).await.success() {
            report.set_status(Stage::Environment, StageStatus::Failed);
            return Err(NbciError::ToolMissing(tool.to_string()));
        }
    }

    if !git::is_git_repo(&config.workdir) {
        report.set_status(Stage::Environment, StageStatus::Failed);
        return Err(NbciError::NotAGitRepo(
            config.workdir.display().to_string(),
        ));
    }

    let venv = config.venv_dir();
    if venv.is_dir() {
        report.info(Stage::Environment, "reusing existing venv");
    } else {
        let create = CommandSpec::new("python3", &config.workdir)
            .args(["-m", "venv", "venv"])
            .timeout_secs(PROVISION_TIMEOUT_SECS);
        let outcome = runner.run(&create).await;
        if !outcome.success() {
            report.set_status(Stage::Environment, StageStatus::Failed);
            return Err(NbciError::Provisioning(format!(
                "venv creation failed: {}",
                outcome.stderr.trim()
            )));
        }
        report.info(Stage::Environment, "created venv");
    }

    // uv is a hard dependency: later stages assume the accelerant exists
    // and only fall back to pip per-install.
    let install_uv = CommandSpec::new(
        config.venv_bin("pip").display().to_string(),
        &config.workdir,
    )
    .args(["install", "uv"])
    .timeout_secs(PROVISION_TIMEOUT_SECS);
    let outcome = runner.run(&install_uv).await;
    if !outcome.success() {
        report.set_status(Stage::Environment, StageStatus::Failed);
        return Err(NbciError::Provisioning(format!(
            "uv install failed: {}",
            outcome.stderr.trim()
        )));
    }

    report.set_status(Stage::Environment, StageStatus::Passed);
    Ok(())
}
