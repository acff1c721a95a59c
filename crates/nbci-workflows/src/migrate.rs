//! Repository migration onto the centralized workflow templates.
//!
//! Downloads the template set, tailors it to the repository (placeholder
//! substitution on the parsed YAML tree, profile-driven overrides), backs
//! up whatever workflows were there before, writes a status report, and
//! commits the result on a migration branch.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_yaml::Value;

use nbci_core::{git, repo_profile, NbciError, RepoProfile, Result};

/// The four template workflows every notebook repository receives.
pub const TEMPLATE_WORKFLOWS: [&str; 4] = [
    "notebook-ci-pr.yml",
    "notebook-ci-main.yml",
    "notebook-ci-on-demand.yml",
    "docs-deploy.yml",
];

/// Placeholder tokens the templates ship with.
pub const ORG_PLACEHOLDER: &str = "your-org";
pub const ACTIONS_REPO_PLACEHOLDER: &str = "dev-actions";

/// The centralized actions repository the placeholders resolve to.
pub const ACTIONS_REPO: &str = "notebook-ci-actions";

const MIGRATION_BRANCH: &str = "ci-migration";
const STATUS_FILE: &str = "migration-status.md";

/// Options for one migration run.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Target repository name (also the profile key).
    pub repo: String,

    /// GitHub organization hosting the templates.
    pub org: String,

    /// Push the migration branch after committing.
    pub push: bool,
}

impl MigrateOptions {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            org: "spacetelescope".to_string(),
            push: false,
        }
    }

    /// Raw-content URL for one template workflow.
    pub fn template_url(&self, name: &str) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/main/examples/workflows/{}",
            self.org, ACTIONS_REPO, name
        )
    }
}

/// What a migration run changed.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub branch: String,
    pub backed_up: Vec<String>,
    pub installed: Vec<String>,
    pub status_path: PathBuf,
}

/// Replace placeholder tokens across every string scalar (and mapping
/// key) of a parsed workflow document.
pub fn substitute_placeholders(value: &mut Value, org: &str) {
    match value {
        Value::String(s) => {
            if s.contains(ORG_PLACEHOLDER) || s.contains(ACTIONS_REPO_PLACEHOLDER) {
                *s = s
                    .replace(ORG_PLACEHOLDER, org)
                    .replace(ACTIONS_REPO_PLACEHOLDER, ACTIONS_REPO);
            }
        }
        Value::Sequence(seq) => {
            for item in seq {
                substitute_placeholders(item, org);
            }
        }
        Value::Mapping(map) => {
            let entries: Vec<(Value, Value)> = std::mem::take(map).into_iter().collect();
            for (mut key, mut val) in entries {
                substitute_placeholders(&mut key, org);
                substitute_placeholders(&mut val, org);
                map.insert(key, val);
            }
        }
        _ => {}
    }
}

/// Apply a repository profile to every `with:` input block in the
/// document: rewrite the Python version and execution mode, inject the
/// post-run script, and disable the security scan where the profile
/// says so.
pub fn apply_profile_overrides(value: &mut Value, profile: &RepoProfile) {
    if let Value::Mapping(map) = value {
        for (key, val) in map.iter_mut() {
            let is_with = key.as_str() == Some("with");
            if is_with {
                if let Value::Mapping(with_map) = val {
                    if let Some(python) = profile.python_version {
                        with_map.insert(
                            Value::String("python-version".to_string()),
                            Value::String(python.to_string()),
                        );
                    }
                    if let Some(mode) = profile.execution_mode {
                        with_map.insert(
                            Value::String("execution-mode".to_string()),
                            Value::String(mode.as_str().to_string()),
                        );
                    }
                    if let Some(script) = profile.post_run_script {
                        with_map.insert(
                            Value::String("post-run-script".to_string()),
                            Value::String(script.to_string()),
                        );
                    }
                    if !profile.security_scan {
                        with_map.insert(
                            Value::String("security-scan".to_string()),
                            Value::Bool(false),
                        );
                    }
                }
            } else {
                apply_profile_overrides(val, profile);
            }
        }
    } else if let Value::Sequence(seq) = value {
        for item in seq {
            apply_profile_overrides(item, profile);
        }
    }
}

/// Tailor one downloaded template: parse, substitute, override,
/// serialize.
pub fn tailor_template(text: &str, options: &MigrateOptions, profile: &RepoProfile) -> Result<String> {
    let mut doc: Value = serde_yaml::from_str(text)?;
    substitute_placeholders(&mut doc, &options.org);
    apply_profile_overrides(&mut doc, profile);
    Ok(serde_yaml::to_string(&doc)?)
}

/// Render the migration status report.
pub fn render_status(
    options: &MigrateOptions,
    profile: &RepoProfile,
    backed_up: &[String],
    installed: &[String],
) -> String {
    let mut md = String::new();
    md.push_str("# CI Migration Status\n\n");
    md.push_str(&format!("- Repository: `{}/{}`\n", options.org, options.repo));
    md.push_str(&format!("- Branch: `{MIGRATION_BRANCH}`\n"));
    md.push_str(&format!("- Migrated at: {}\n", Utc::now().to_rfc3339()));
    md.push('\n');

    md.push_str("## Installed workflows\n\n");
    for name in installed {
        md.push_str(&format!("- `{name}`\n"));
    }

    md.push_str("\n## Backed-up workflows\n\n");
    if backed_up.is_empty() {
        md.push_str("- none\n");
    } else {
        for name in backed_up {
            md.push_str(&format!("- `.github/workflows-backup/{name}`\n"));
        }
    }

    md.push_str("\n## Applied overrides\n\n");
    if let Some(python) = profile.python_version {
        md.push_str(&format!("- Python version: `{python}`\n"));
    }
    if let Some(mode) = profile.execution_mode {
        md.push_str(&format!("- Execution mode: `{mode}`\n"));
    }
    if let Some(script) = profile.post_run_script {
        md.push_str(&format!("- Post-run script: `{script}`\n"));
    }
    if !profile.security_scan {
        md.push_str("- Security scan: disabled\n");
    }
    if profile.python_version.is_none()
        && profile.execution_mode.is_none()
        && profile.post_run_script.is_none()
        && profile.security_scan
    {
        md.push_str("- none (default profile)\n");
    }

    md
}

/// Run the full migration against a repository working directory.
pub async fn migrate(repo_dir: &Path, options: &MigrateOptions) -> Result<MigrationOutcome> {
    if !git::is_git_repo(repo_dir) {
        return Err(NbciError::NotAGitRepo(repo_dir.display().to_string()));
    }

    // Remote mismatch is a warning; the caller may be migrating a fork
    // or a local clone under a different name.
    match git::remote_url(repo_dir) {
        Some(url) if !url.contains(&options.repo) => {
            tracing::warn!(remote = %url, repo = %options.repo, "remote does not match target repository");
        }
        None => tracing::warn!("no origin remote configured"),
        _ => {}
    }

    let branch = MIGRATION_BRANCH.to_string();
    if git::branch_exists(repo_dir, &branch) {
        git::run_git(repo_dir, &["checkout", &branch])?;
        tracing::info!(%branch, "reusing existing migration branch");
    } else {
        git::run_git(repo_dir, &["checkout", "-b", &branch])?;
        tracing::info!(%branch, "created migration branch");
    }

    let backed_up = backup_workflows(repo_dir)?;

    let profile = repo_profile(&options.repo);
    let workflows_dir = repo_dir.join(".github").join("workflows");
    std::fs::create_dir_all(&workflows_dir)?;

    let mut installed = Vec::new();
    for name in TEMPLATE_WORKFLOWS {
        let url = options.template_url(name);
        let text = download_template(&url).await?;
        let tailored = tailor_template(&text, options, profile)?;
        std::fs::write(workflows_dir.join(name), tailored)?;
        installed.push(name.to_string());
        tracing::info!(workflow = name, "installed template workflow");
    }

    scaffold_post_run_script(repo_dir, profile)?;

    let status_path = repo_dir.join(STATUS_FILE);
    std::fs::write(&status_path, render_status(options, profile, &backed_up, &installed))?;

    let staged = staged_paths(profile);
    let mut add_args = vec!["add"];
    add_args.extend(staged.iter().map(String::as_str));
    git::run_git(repo_dir, &add_args)?;
    let message = format!(
        "Migrate {} to centralized notebook CI workflows",
        options.repo
    );
    git::run_git(repo_dir, &["commit", "-m", &message])?;

    if options.push {
        git::run_git(repo_dir, &["push", "-u", "origin", &branch])?;
    }

    Ok(MigrationOutcome {
        branch,
        backed_up,
        installed,
        status_path,
    })
}

/// Everything a migration run writes and must therefore commit: the
/// workflow tree, the status report, and the profile's post-run script
/// when one is scaffolded.
fn staged_paths(profile: &RepoProfile) -> Vec<String> {
    let mut paths = vec![".github".to_string(), STATUS_FILE.to_string()];
    if let Some(script) = profile.post_run_script {
        paths.push(script.to_string());
    }
    paths
}

/// Fetch one template workflow; any failure is fatal for the migration.
async fn download_template(url: &str) -> Result<String> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| NbciError::TemplateDownload {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    if !response.status().is_success() {
        return Err(NbciError::TemplateDownload {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }
    response.text().await.map_err(|e| NbciError::TemplateDownload {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Copy existing workflow files into `.github/workflows-backup/`.
fn backup_workflows(repo_dir: &Path) -> Result<Vec<String>> {
    let source = repo_dir.join(".github").join("workflows");
    let mut backed_up = Vec::new();
    if !source.is_dir() {
        return Ok(backed_up);
    }

    let backup_dir = repo_dir.join(".github").join("workflows-backup");
    std::fs::create_dir_all(&backup_dir)?;
    let mut names: Vec<String> = std::fs::read_dir(&source)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext == "yml" || ext == "yaml")
        })
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    names.sort();

    for name in &names {
        std::fs::copy(source.join(name), backup_dir.join(name))?;
        backed_up.push(name.clone());
    }
    Ok(backed_up)
}

/// Repositories whose profile references a post-run script get a stub
/// scaffolded if the script does not exist yet.
fn scaffold_post_run_script(repo_dir: &Path, profile: &RepoProfile) -> Result<()> {
    let Some(script) = profile.post_run_script else {
        return Ok(());
    };
    let path = repo_dir.join(script);
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        &path,
        "#!/bin/bash\n# Post-run processing for executed notebooks.\n# Populate with repository-specific steps.\nset -euo pipefail\n",
    )?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }
    tracing::info!(script = %path.display(), "scaffolded post-run script");
    Ok(())
}
