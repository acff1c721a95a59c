//! Integration tests for the full local CI pipeline with a scripted runner.

use std::path::Path;
use std::process::Command;

use nbci_pipeline::fakes::ScriptedRunner;
use nbci_pipeline::{CommandOutcome, LocalCiPipeline};

use nbci_core::{ExecutionMode, NbciError, PipelineConfig, Stage, StageStatus};

fn git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Scratch git repo with a notebooks directory.
fn make_repo(notebooks: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-b", "main"]);
    git(dir.path(), &["config", "user.name", "t"]);
    git(dir.path(), &["config", "user.email", "t@t"]);
    let nb_dir = dir.path().join("notebooks");
    std::fs::create_dir_all(&nb_dir).unwrap();
    for name in notebooks {
        std::fs::write(nb_dir.join(name), format!("{{\"cells\": [], \"id\": \"{name}\"}}"))
            .unwrap();
    }
    dir
}

fn config_for(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::new(dir.to_path_buf());
    // Docs build needs real config files; keep it out of most scenarios.
    config.build_documentation = false;
    config
}

/// Full-mode scenario: one notebook succeeds, one fails. The failing one
/// gets a `_failed` marker, the run still exits zero.
#[tokio::test]
async fn test_full_run_with_one_failing_notebook_exits_zero() {
    let repo = make_repo(&["a.ipynb", "b.ipynb"]);
    let mut config = config_for(repo.path());
    config.execution_mode = ExecutionMode::Full;
    config.run_security_scan = false;

    let b_original = std::fs::read(repo.path().join("notebooks/b.ipynb")).unwrap();
    // Fail only b.ipynb's execution; everything else succeeds.
    let runner = ScriptedRunner::new().on("b.ipynb", CommandOutcome::failed(1));

    let result = LocalCiPipeline::run(&config, &runner).await.unwrap();

    assert_eq!(result.exit_code(), 0);
    assert!(repo.path().join("notebooks/b_failed.ipynb").is_file());
    assert_eq!(
        std::fs::read(repo.path().join("notebooks/b.ipynb")).unwrap(),
        b_original
    );
    assert_eq!(
        result.report.status(Stage::Execution),
        Some(StageStatus::Failed)
    );
    let summary = result.report.render_summary(&config);
    assert!(summary.contains("b_failed.ipynb"));
}

/// Validation-only run touches no notebook and passes every active stage.
#[tokio::test]
async fn test_validation_only_run() {
    let repo = make_repo(&["a.ipynb"]);
    let mut config = config_for(repo.path());
    config.run_security_scan = false;

    let runner = ScriptedRunner::new();
    let result = LocalCiPipeline::run(&config, &runner).await.unwrap();

    assert_eq!(result.exit_code(), 0);
    assert_eq!(
        result.report.status(Stage::Validation),
        Some(StageStatus::Passed)
    );
    assert_eq!(
        result.report.status(Stage::Execution),
        Some(StageStatus::Skipped)
    );
    assert_eq!(runner.count_matching("--inplace"), 0);
}

/// The provisioner is the first stage; with python3 missing the pipeline
/// aborts before any notebook work.
#[tokio::test]
async fn test_missing_interpreter_aborts_run() {
    let repo = make_repo(&["a.ipynb"]);
    let config = config_for(repo.path());

    let runner = ScriptedRunner::new().on("python3 --version", CommandOutcome::failed(127));
    let err = LocalCiPipeline::run(&config, &runner).await.unwrap_err();
    assert!(matches!(err, NbciError::ToolMissing(_)));
    assert_eq!(runner.count_matching("pytest"), 0);
}

/// Second run against the same repo reuses the venv directory.
#[tokio::test]
async fn test_environment_setup_idempotent() {
    let repo = make_repo(&["a.ipynb"]);
    let mut config = config_for(repo.path());
    config.run_security_scan = false;
    std::fs::create_dir_all(config.venv_dir()).unwrap();

    let runner = ScriptedRunner::new();
    for _ in 0..2 {
        LocalCiPipeline::run(&config, &runner).await.unwrap();
    }
    assert_eq!(runner.count_matching("-m venv venv"), 0);
}

/// Repository profile drives the command environment: in hst_notebooks
/// the CRDS variables reach the validation command.
#[tokio::test]
async fn test_profile_env_reaches_commands() {
    let dir = tempfile::tempdir().unwrap();
    let workdir = dir.path().join("hst_notebooks");
    std::fs::create_dir_all(&workdir).unwrap();
    git(&workdir, &["init", "-b", "main"]);
    git(&workdir, &["config", "user.name", "t"]);
    git(&workdir, &["config", "user.email", "t@t"]);
    std::fs::create_dir_all(workdir.join("notebooks")).unwrap();
    std::fs::write(workdir.join("notebooks/a.ipynb"), "{}").unwrap();

    let mut config = config_for(&workdir);
    config.run_security_scan = false;

    let runner = ScriptedRunner::new();
    let result = LocalCiPipeline::run(&config, &runner).await.unwrap();
    assert_eq!(result.exit_code(), 0);
    assert!(result
        .report
        .records
        .iter()
        .any(|r| r.message.contains("CRDS_SERVER_URL")));
}
