//! Harness for running workflows through act locally.

use std::path::{Path, PathBuf};

use nbci_core::{NbciError, Result};
use nbci_pipeline::{CommandRunner, CommandSpec};

/// Options for one act invocation.
#[derive(Debug, Clone)]
pub struct ActOptions {
    /// Event to simulate.
    pub event: String,

    /// Restrict to one workflow file.
    pub workflow: Option<PathBuf>,

    /// Restrict to one job.
    pub job: Option<String>,

    /// Plan only, execute nothing.
    pub dry_run: bool,

    /// Verbose act output.
    pub verbose: bool,
}

impl Default for ActOptions {
    fn default() -> Self {
        Self {
            event: "pull_request".to_string(),
            workflow: None,
            job: None,
            dry_run: false,
            verbose: false,
        }
    }
}

/// Run act with the given options, returning its exit code.
///
/// Unlike the validator's opportunistic dry-run, a missing act binary is
/// a hard error here: this command exists solely to drive it.
pub async fn run_act(
    repo_dir: &Path,
    options: &ActOptions,
    runner: &dyn CommandRunner,
) -> Result<i32> {
    let probe = CommandSpec::new("act", repo_dir).arg("--version");
    if !runner.run(&probe).await.success() {
        return Err(NbciError::ToolMissing("act".to_string()));
    }

    let mut spec = CommandSpec::new("act", repo_dir).arg(&options.event);
    if let Some(workflow) = &options.workflow {
        spec = spec.arg("-W").arg(workflow.display().to_string());
    }
    if let Some(job) = &options.job {
        spec = spec.arg("-j").arg(job);
    }
    if options.dry_run {
        spec = spec.arg("--dryrun");
    }
    if options.verbose {
        spec = spec.arg("--verbose");
    }

    let outcome = runner.run(&spec).await;
    if outcome.success() {
        tracing::info!(event = %options.event, "act run passed");
    } else {
        tracing::warn!(event = %options.event, exit = outcome.exit_code, "act run failed");
    }
    Ok(outcome.exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbci_pipeline::fakes::ScriptedRunner;
    use nbci_pipeline::CommandOutcome;

    #[tokio::test]
    async fn test_missing_act_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new().on("act --version", CommandOutcome::failed(127));
        let err = run_act(dir.path(), &ActOptions::default(), &runner)
            .await
            .unwrap_err();
        assert!(matches!(err, NbciError::ToolMissing(t) if t == "act"));
    }

    #[tokio::test]
    async fn test_arguments_assembled() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new();
        let options = ActOptions {
            event: "push".to_string(),
            workflow: Some(PathBuf::from(".github/workflows/ci.yml")),
            job: Some("execute".to_string()),
            dry_run: true,
            verbose: false,
        };
        let code = run_act(dir.path(), &options, &runner).await.unwrap();
        assert_eq!(code, 0);
        let line = runner.calls().last().unwrap().clone();
        assert!(line.contains("act push"));
        assert!(line.contains("-W .github/workflows/ci.yml"));
        assert!(line.contains("-j execute"));
        assert!(line.contains("--dryrun"));
    }

    #[tokio::test]
    async fn test_failure_exit_code_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new().on("act pull_request", CommandOutcome::failed(3));
        let code = run_act(dir.path(), &ActOptions::default(), &runner)
            .await
            .unwrap();
        assert_eq!(code, 3);
    }
}
