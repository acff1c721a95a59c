//! Static validation of workflow definition files.
//!
//! Three independent checks per file: YAML well-formedness, a textual
//! structural check (required top-level keys, no placeholder leftovers,
//! no local-action references), and an optional act dry-run when that
//! tool is installed. Structural problems are errors; act failures are
//! warnings; the script's exit code depends only on the error count.

use std::path::{Path, PathBuf};

use nbci_core::Result;
use nbci_pipeline::{CommandRunner, CommandSpec};

/// Substrings that mark an untailored template.
pub const PLACEHOLDER_SUBSTRINGS: &[&str] = &["your-org", "your-repo-name"];

/// Workflows must reference the centralized actions repo, never a
/// local action checked into the repository itself.
pub const LOCAL_ACTION_ANTIPATTERN: &str = "uses: ./";

const REQUIRED_TOP_LEVEL_KEYS: &[&str] = &["name:", "on:", "jobs:"];

/// Options for one validation run.
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// Attempt act dry-runs when the tool is installed.
    pub validate_act: bool,

    /// Log act absence instead of staying silent.
    pub verbose: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            validate_act: true,
            verbose: false,
        }
    }
}

/// Aggregated validation verdict across all workflow files.
#[derive(Debug, Clone, Default)]
pub struct WorkflowVerdict {
    pub files_checked: usize,
    pub passed: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl WorkflowVerdict {
    /// Nonzero only when hard errors were found; warnings alone pass.
    pub fn exit_code(&self) -> i32 {
        if self.errors.is_empty() {
            0
        } else {
            1
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Checked {} workflow file(s): {} passed, {} warning(s), {} error(s)\n",
            self.files_checked,
            self.passed,
            self.warnings.len(),
            self.errors.len()
        ));
        for warning in &self.warnings {
            out.push_str(&format!("  warning: {warning}\n"));
        }
        for error in &self.errors {
            out.push_str(&format!("  error: {error}\n"));
        }
        out
    }
}

/// Structural and syntax checks on one workflow file's text.
///
/// Returns the list of problems; an empty list means the file passes.
pub fn check_workflow_text(name: &str, text: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if let Err(e) = serde_yaml::from_str::<serde_yaml::Value>(text) {
        problems.push(format!("{name}: invalid YAML: {e}"));
        // Without a parse the structural checks below still apply;
        // they are textual by design.
    }

    for key in REQUIRED_TOP_LEVEL_KEYS {
        // Top level means column zero; a textual check sidesteps the
        // YAML 1.1 quirk of `on` parsing as a boolean.
        let present = text.lines().any(|line| line.starts_with(key));
        if !present {
            problems.push(format!("{name}: missing top-level `{key}` key"));
        }
    }

    for placeholder in PLACEHOLDER_SUBSTRINGS {
        if text.contains(placeholder) {
            problems.push(format!("{name}: contains placeholder reference `{placeholder}`"));
        }
    }

    if text.contains(LOCAL_ACTION_ANTIPATTERN) {
        problems.push(format!(
            "{name}: references a local action (`{LOCAL_ACTION_ANTIPATTERN}...`)"
        ));
    }

    problems
}

/// Collect `.github/workflows/*.yml|*.yaml`, sorted.
pub fn workflow_files(repo_dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = repo_dir.join(".github").join("workflows");
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if path.is_file() && is_yaml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Validate every workflow file under a repository.
pub async fn validate_workflows(
    repo_dir: &Path,
    options: &ValidatorOptions,
    runner: &dyn CommandRunner,
) -> Result<WorkflowVerdict> {
    let mut verdict = WorkflowVerdict::default();
    let files = workflow_files(repo_dir)?;

    let act_available = if options.validate_act {
        let probe = CommandSpec::new("act", repo_dir).arg("--version");
        let available = runner.run(&probe).await.success();
        if !available && options.verbose {
            tracing::info!("act not installed, skipping dry-run validation");
        }
        available
    } else {
        false
    };

    for path in &files {
        verdict.files_checked += 1;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let text = std::fs::read_to_string(path)?;
        let problems = check_workflow_text(&name, &text);
        let structurally_ok = problems.is_empty();
        verdict.errors.extend(problems);

        let mut act_ok = true;
        if act_available {
            let dry_run = CommandSpec::new("act", repo_dir)
                .arg("--dryrun")
                .arg("-W")
                .arg(path.display().to_string());
            if !runner.run(&dry_run).await.success() {
                act_ok = false;
                verdict
                    .warnings
                    .push(format!("{name}: act dry-run failed"));
            }
        }

        if structurally_ok && act_ok {
            verdict.passed += 1;
            tracing::debug!(file = %name, "workflow passed validation");
        }
    }

    Ok(verdict)
}
