//! Dependency installation stage.
//!
//! Three steps with different failure policies:
//! - core notebook/scan tooling: fatal if both uv and pip fail
//! - repository manifest installs: warning if both installers fail
//! - repository-specific extras (profile env vars, import smoke tests):
//!   warnings only

use std::collections::BTreeMap;

use nbci_core::{NbciError, PipelineConfig, RepoProfile, Result, RunReport, Stage, StageStatus};

use crate::runner::{CommandRunner, CommandSpec};

/// Core toolchain installed into every venv.
const CORE_PACKAGES: [&str; 5] = ["jupyter", "nbval", "pytest", "bandit", "jupyter-book"];

const CORE_INSTALL_TIMEOUT_SECS: u64 = 600;
const MANIFEST_TIMEOUT_SECS: u64 = 600;
const LARGE_MANIFEST_TIMEOUT_SECS: u64 = 1800;

/// Requirements files longer than this get the extended install timeout.
const LARGE_MANIFEST_LINES: usize = 50;

pub async fn run(
    config: &PipelineConfig,
    profile: &RepoProfile,
    runner: &dyn CommandRunner,
    report: &mut RunReport,
    env: &mut BTreeMap<String, String>,
) -> Result<()> {
    if config.skip_deps {
        report.info(Stage::Dependencies, "SKIP_DEPS set, assuming toolchain present");
        report.set_status(Stage::Dependencies, StageStatus::Skipped);
        apply_profile_env(profile, report, env);
        return Ok(());
    }

    install_core_tools(config, runner, report).await?;
    install_manifest(config, runner, report).await;
    apply_profile_env(profile, report, env);
    probe_profile_import(config, profile, runner, report, env).await;

    report.set_status(Stage::Dependencies, StageStatus::Passed);
    Ok(())
}

/// Step A: the notebook runner and analysis libraries. Skipped when they
/// already import cleanly; fatal when neither installer can provide them.
async fn install_core_tools(
    config: &PipelineConfig,
    runner: &dyn CommandRunner,
    report: &mut RunReport,
) -> Result<()> {
    let probe = CommandSpec::new(
        config.venv_bin("python").display().to_string(),
        &config.workdir,
    )
    .args(["-c", "import jupyter_core, nbval, pytest, bandit"]);
    if runner.run(&probe).await.success() {
        report.info(Stage::Dependencies, "core tools already importable, skipping install");
        return Ok(());
    }

    let uv_install = CommandSpec::new(
        config.venv_bin("uv").display().to_string(),
        &config.workdir,
    )
    .args(["pip", "install"])
    .args(CORE_PACKAGES)
    .timeout_secs(CORE_INSTALL_TIMEOUT_SECS);
    if runner.run(&uv_install).await.success() {
        report.info(Stage::Dependencies, "core tools installed via uv");
        return Ok(());
    }

    report.warn(Stage::Dependencies, "uv install of core tools failed, retrying with pip");
    let pip_install = CommandSpec::new(
        config.venv_bin("pip").display().to_string(),
        &config.workdir,
    )
    .arg("install")
    .args(CORE_PACKAGES)
    .timeout_secs(CORE_INSTALL_TIMEOUT_SECS);
    let outcome = runner.run(&pip_install).await;
    if outcome.success() {
        report.info(Stage::Dependencies, "core tools installed via pip");
        return Ok(());
    }

    report.set_status(Stage::Dependencies, StageStatus::Failed);
    Err(NbciError::InstallFailed(format!(
        "core tools failed via uv and pip: {}",
        outcome.stderr.trim()
    )))
}

/// Step B: the repository's own dependency manifest. Both installers
/// failing is a warning, not fatal.
async fn install_manifest(
    config: &PipelineConfig,
    runner: &dyn CommandRunner,
    report: &mut RunReport,
) {
    let requirements = config.workdir.join("requirements.txt");
    let pyproject = config.workdir.join("pyproject.toml");

    let (install_args, timeout) = if requirements.is_file() {
        let lines = std::fs::read_to_string(&requirements)
            .map(|s| s.lines().count())
            .unwrap_or(0);
        let timeout = if lines > LARGE_MANIFEST_LINES {
            LARGE_MANIFEST_TIMEOUT_SECS
        } else {
            MANIFEST_TIMEOUT_SECS
        };
        report.info(
            Stage::Dependencies,
            format!("requirements.txt has {lines} lines, install timeout {timeout}s"),
        );
        (vec!["install".to_string(), "-r".to_string(), "requirements.txt".to_string()], timeout)
    } else if pyproject.is_file() {
        (vec!["install".to_string(), ".".to_string()], MANIFEST_TIMEOUT_SECS)
    } else {
        report.warn(Stage::Dependencies, "no requirements.txt or pyproject.toml found");
        return;
    };

    let uv_install = CommandSpec::new(
        config.venv_bin("uv").display().to_string(),
        &config.workdir,
    )
    .arg("pip")
    .args(install_args.clone())
    .timeout_secs(timeout);
    if runner.run(&uv_install).await.success() {
        report.info(Stage::Dependencies, "repository dependencies installed via uv");
        return;
    }

    let pip_install = CommandSpec::new(
        config.venv_bin("pip").display().to_string(),
        &config.workdir,
    )
    .args(install_args)
    .timeout_secs(timeout);
    if runner.run(&pip_install).await.success() {
        report.info(Stage::Dependencies, "repository dependencies installed via pip");
        return;
    }

    report.warn(
        Stage::Dependencies,
        "repository dependency install failed via uv and pip, continuing",
    );
}

/// Step C (part 1): profile env vars ride the command overlay for the
/// rest of the run.
fn apply_profile_env(
    profile: &RepoProfile,
    report: &mut RunReport,
    env: &mut BTreeMap<String, String>,
) {
    for (key, value) in profile.env {
        report.info(Stage::Dependencies, format!("setting {key} for this repository"));
        env.insert((*key).to_string(), (*value).to_string());
    }
}

/// Step C (part 2): smoke-test the profile's optional import.
async fn probe_profile_import(
    config: &PipelineConfig,
    profile: &RepoProfile,
    runner: &dyn CommandRunner,
    report: &mut RunReport,
    env: &BTreeMap<String, String>,
) {
    let Some(module) = profile.probe_import else {
        return;
    };
    let probe = CommandSpec::new(
        config.venv_bin("python").display().to_string(),
        &config.workdir,
    )
    .args(["-c", &format!("import {module}")])
    .envs(env);
    if runner.run(&probe).await.success() {
        report.info(Stage::Dependencies, format!("optional package {module} is importable"));
    } else {
        report.warn(
            Stage::Dependencies,
            format!("optional package {module} is not importable"),
        );
    }
}
