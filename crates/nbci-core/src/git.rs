//! Git integration utilities shared by the pipeline and the migration tools.

use std::path::Path;
use std::process::Command;

use crate::error::{NbciError, Result};

/// Run a git subcommand in the given directory and return trimmed stdout.
pub fn run_git(repo_dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .map_err(|e| NbciError::GitError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NbciError::GitError(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Current branch name, e.g. `main`.
pub fn current_branch(repo_dir: &Path) -> Result<String> {
    let branch = run_git(repo_dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if branch.is_empty() {
        return Err(NbciError::GitError(
            "git rev-parse returned empty branch name".to_string(),
        ));
    }
    Ok(branch)
}

/// URL of the `origin` remote, if configured.
pub fn remote_url(repo_dir: &Path) -> Option<String> {
    run_git(repo_dir, &["remote", "get-url", "origin"]).ok()
}

/// Whether the working tree has no staged or unstaged changes.
pub fn is_worktree_clean(repo_dir: &Path) -> bool {
    run_git(repo_dir, &["status", "--porcelain"])
        .map(|out| out.is_empty())
        .unwrap_or(false)
}

/// Whether a local branch with this name exists.
pub fn branch_exists(repo_dir: &Path, name: &str) -> bool {
    run_git(
        repo_dir,
        &["rev-parse", "--verify", &format!("refs/heads/{name}")],
    )
    .is_ok()
}
