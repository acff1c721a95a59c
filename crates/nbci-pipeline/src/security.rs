//! Security scan stage.
//!
//! Bandit cannot read notebooks directly, so each one is converted to a
//! plain script next to the source, the tree is scanned, and the scripts
//! are removed again whatever the scan said. Findings are advisory.

use std::collections::BTreeMap;

use nbci_core::{notebooks, PipelineConfig, RepoProfile, Result, RunReport, Stage, StageStatus};

use crate::runner::{CommandRunner, CommandSpec};

pub async fn run(
    config: &PipelineConfig,
    profile: &RepoProfile,
    runner: &dyn CommandRunner,
    report: &mut RunReport,
    env: &BTreeMap<String, String>,
) -> Result<()> {
    if !config.run_security_scan {
        report.info(Stage::SecurityScan, "security scan disabled by configuration");
        report.set_status(Stage::SecurityScan, StageStatus::Skipped);
        return Ok(());
    }
    if !profile.security_scan {
        report.info(Stage::SecurityScan, "security scan disabled for this repository");
        report.set_status(Stage::SecurityScan, StageStatus::Skipped);
        return Ok(());
    }

    let dir = config.notebooks_dir();
    let found = notebooks::discover(&dir)?;
    if found.is_empty() {
        report.warn(Stage::SecurityScan, "no notebooks found, skipping security scan");
        report.set_status(Stage::SecurityScan, StageStatus::Skipped);
        return Ok(());
    }

    let mut generated = Vec::new();
    for notebook in &found {
        let convert = CommandSpec::new(
            config.venv_bin("jupyter").display().to_string(),
            &config.workdir,
        )
        .args(["nbconvert", "--to", "script"])
        .arg(notebook.display().to_string())
        .envs(env);
        let outcome = runner.run(&convert).await;
        let script = notebooks::script_path(notebook);
        if outcome.success() && script.is_file() {
            generated.push(script);
        } else {
            report.warn(
                Stage::SecurityScan,
                format!("could not convert {} to script", notebook.display()),
            );
        }
    }

    if generated.is_empty() {
        report.warn(Stage::SecurityScan, "no scripts generated, nothing to scan");
        report.set_status(Stage::SecurityScan, StageStatus::Skipped);
        return Ok(());
    }

    let scan = CommandSpec::new(
        config.venv_bin("bandit").display().to_string(),
        &config.workdir,
    )
    .arg("-r")
    .arg(dir.display().to_string())
    .envs(env);
    let outcome = runner.run(&scan).await;
    if outcome.success() {
        report.info(Stage::SecurityScan, "bandit scan clean");
    } else {
        report.warn(
            Stage::SecurityScan,
            format!("bandit reported findings (exit {})", outcome.exit_code),
        );
    }

    // Cleanup runs regardless of the scan outcome.
    for script in &generated {
        if let Err(e) = std::fs::remove_file(script) {
            report.warn(
                Stage::SecurityScan,
                format!("could not remove {}: {e}", script.display()),
            );
        }
    }

    report.set_status(Stage::SecurityScan, StageStatus::Passed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedRunner;
    use crate::runner::CommandOutcome;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn setup(names: &[&str]) -> (tempfile::TempDir, PipelineConfig) {
        let dir = tempfile::tempdir().unwrap();
        let nb_dir = dir.path().join("notebooks");
        std::fs::create_dir_all(&nb_dir).unwrap();
        for name in names {
            std::fs::write(nb_dir.join(name), "{}").unwrap();
        }
        let config = PipelineConfig::new(dir.path().to_path_buf());
        (dir, config)
    }

    /// Runner that writes the expected script file on nbconvert calls,
    /// simulating the real tool's side effect.
    struct ConvertingRunner {
        inner: ScriptedRunner,
        scripts: Mutex<Vec<PathBuf>>,
    }

    impl ConvertingRunner {
        fn new(inner: ScriptedRunner) -> Self {
            Self {
                inner,
                scripts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for ConvertingRunner {
        async fn run(&self, spec: &CommandSpec) -> CommandOutcome {
            let outcome = self.inner.run(spec).await;
            if spec.display().contains("--to script") && outcome.success() {
                if let Some(nb) = spec.args.last() {
                    let script = notebooks::script_path(std::path::Path::new(nb));
                    std::fs::write(&script, "print('converted')\n").unwrap();
                    self.scripts.lock().unwrap().push(script);
                }
            }
            outcome
        }
    }

    #[tokio::test]
    async fn test_disabled_by_config() {
        let (_dir, mut config) = setup(&["a.ipynb"]);
        config.run_security_scan = false;
        let runner = ScriptedRunner::new();
        let mut report = RunReport::new("d".into());

        run(&config, &RepoProfile::default(), &runner, &mut report, &BTreeMap::new())
            .await
            .unwrap();
        assert!(runner.calls().is_empty());
        assert_eq!(report.status(Stage::SecurityScan), Some(StageStatus::Skipped));
    }

    #[tokio::test]
    async fn test_disabled_by_profile() {
        let (_dir, config) = setup(&["a.ipynb"]);
        let profile = nbci_core::repo_profile("hello_universe");
        let runner = ScriptedRunner::new();
        let mut report = RunReport::new("d".into());

        run(&config, profile, &runner, &mut report, &BTreeMap::new())
            .await
            .unwrap();
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scripts_cleaned_up_after_scan() {
        let (dir, config) = setup(&["a.ipynb", "b.ipynb"]);
        let runner = ConvertingRunner::new(ScriptedRunner::new());
        let mut report = RunReport::new("d".into());

        run(&config, &RepoProfile::default(), &runner, &mut report, &BTreeMap::new())
            .await
            .unwrap();

        // No generated scripts survive the stage.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("notebooks"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "py"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(report.status(Stage::SecurityScan), Some(StageStatus::Passed));
    }

    #[tokio::test]
    async fn test_scan_findings_are_advisory_and_cleanup_still_runs() {
        let (dir, config) = setup(&["a.ipynb"]);
        let runner =
            ConvertingRunner::new(ScriptedRunner::new().on("bandit", CommandOutcome::failed(1)));
        let mut report = RunReport::new("d".into());

        run(&config, &RepoProfile::default(), &runner, &mut report, &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(report.exit_code(), 0);
        assert!(report.warnings().any(|r| r.message.contains("bandit")));
        assert!(!dir.path().join("notebooks/a.py").exists());
    }

    #[tokio::test]
    async fn test_zero_scripts_generated_is_warning() {
        let (_dir, config) = setup(&["a.ipynb"]);
        // Conversion "succeeds" but never writes a script file.
        let runner = ScriptedRunner::new();
        let mut report = RunReport::new("d".into());

        run(&config, &RepoProfile::default(), &runner, &mut report, &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(report.status(Stage::SecurityScan), Some(StageStatus::Skipped));
        assert!(report.warnings().any(|r| r.message.contains("nothing to scan")));
        // bandit never ran.
        assert_eq!(runner.count_matching("bandit"), 0);
    }
}
