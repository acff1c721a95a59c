//! Advisory migration-readiness scoring.
//!
//! Ten boolean checks over the repository's file-system and git state,
//! summed to a 0-10 score with a banded go/no-go recommendation. Purely
//! informational; nothing is ever mutated.

use std::path::Path;
use std::process::Command;

use nbci_core::{git, notebooks};

/// Instrument libraries grepped for in notebook sources, logged only.
const INSTRUMENT_LIBRARIES: &[&str] = &["stistools", "costools", "jwst", "astroquery"];

const MANIFEST_FILES: &[&str] = &["requirements.txt", "pyproject.toml", "environment.yml"];

/// One readiness check and its outcome.
#[derive(Debug, Clone)]
pub struct ReadinessCheck {
    pub name: &'static str,
    pub passed: bool,
}

/// Recommendation band derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// >= 80%: ready for migration.
    Ready,
    /// >= 60%: mostly ready, minor gaps.
    MostlyReady,
    /// < 60%: needs work before migrating.
    NeedsWork,
}

impl Band {
    pub fn message(&self) -> &'static str {
        match self {
            Band::Ready => "ready for migration",
            Band::MostlyReady => "mostly ready, address the gaps below first",
            Band::NeedsWork => "needs work before migration",
        }
    }
}

/// Full readiness assessment for one repository.
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    pub checks: Vec<ReadinessCheck>,
}

impl ReadinessReport {
    pub fn score(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn total(&self) -> usize {
        self.checks.len()
    }

    pub fn percent(&self) -> u32 {
        if self.checks.is_empty() {
            return 0;
        }
        (self.score() * 100 / self.total()) as u32
    }

    pub fn band(&self) -> Band {
        let percent = self.percent();
        if percent >= 80 {
            Band::Ready
        } else if percent >= 60 {
            Band::MostlyReady
        } else {
            Band::NeedsWork
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("Repository readiness\n");
        out.push_str("--------------------\n");
        for check in &self.checks {
            let mark = if check.passed { "ok " } else { "MISSING" };
            out.push_str(&format!("  [{mark:<7}] {}\n", check.name));
        }
        out.push_str(&format!(
            "\nScore: {}/{} ({}%) - {}\n",
            self.score(),
            self.total(),
            self.percent(),
            self.band().message()
        ));
        out
    }
}

/// Assess a repository, including the optional GitHub CLI check.
pub fn assess(repo_dir: &Path, repo_name: &str, org: &str) -> ReadinessReport {
    let gh_ok = gh_accessible(repo_name, org);
    let report = assess_with_gh(repo_dir, gh_ok);
    log_instrument_libraries(repo_dir);
    report
}

/// Assess with the GitHub CLI outcome supplied by the caller; the CLI
/// check needs network and auth, so tests pin it.
pub fn assess_with_gh(repo_dir: &Path, gh_accessible: bool) -> ReadinessReport {
    let has_manifest = MANIFEST_FILES
        .iter()
        .any(|name| repo_dir.join(name).is_file());
    let branch_ok = git::current_branch(repo_dir)
        .map(|b| b == "main" || b == "master")
        .unwrap_or(false);

    let checks = vec![
        ReadinessCheck {
            name: "git repository (.git present)",
            passed: repo_dir.join(".git").exists(),
        },
        ReadinessCheck {
            name: "notebooks/ directory",
            passed: repo_dir.join("notebooks").is_dir(),
        },
        ReadinessCheck {
            name: "_config.yml",
            passed: repo_dir.join("_config.yml").is_file(),
        },
        ReadinessCheck {
            name: "_toc.yml",
            passed: repo_dir.join("_toc.yml").is_file(),
        },
        ReadinessCheck {
            name: ".github/workflows/ directory",
            passed: repo_dir.join(".github").join("workflows").is_dir(),
        },
        ReadinessCheck {
            name: "dependency manifest",
            passed: has_manifest,
        },
        ReadinessCheck {
            name: "clean working tree",
            passed: git::is_worktree_clean(repo_dir),
        },
        ReadinessCheck {
            name: "origin remote configured",
            passed: git::remote_url(repo_dir).is_some(),
        },
        ReadinessCheck {
            name: "on main/master branch",
            passed: branch_ok,
        },
        ReadinessCheck {
            name: "accessible via GitHub CLI",
            passed: gh_accessible,
        },
    ];

    ReadinessReport { checks }
}

/// Whether `gh repo view` can see the repository. Missing tool counts
/// as inaccessible.
fn gh_accessible(repo_name: &str, org: &str) -> bool {
    Command::new("gh")
        .args(["repo", "view", &format!("{org}/{repo_name}")])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Informational only: which instrument libraries the notebooks mention.
fn log_instrument_libraries(repo_dir: &Path) {
    let found = notebooks::discover(&repo_dir.join("notebooks")).unwrap_or_default();
    for library in INSTRUMENT_LIBRARIES {
        let mentioned = found.iter().any(|path| {
            std::fs::read_to_string(path)
                .map(|text| text.contains(library))
                .unwrap_or(false)
        });
        if mentioned {
            tracing::info!(library, "notebooks reference instrument library");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn git_cmd(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(output.status.success());
    }

    /// Scratch repo passing 8 of 10 checks: everything except the origin
    /// remote and the GitHub CLI.
    fn make_repo_8_of_10() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git_cmd(dir.path(), &["init", "-b", "main"]);
        git_cmd(dir.path(), &["config", "user.name", "t"]);
        git_cmd(dir.path(), &["config", "user.email", "t@t"]);
        std::fs::create_dir_all(dir.path().join("notebooks")).unwrap();
        std::fs::create_dir_all(dir.path().join(".github/workflows")).unwrap();
        std::fs::write(dir.path().join("_config.yml"), "title: x\n").unwrap();
        std::fs::write(dir.path().join("_toc.yml"), "format: jb-book\n").unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "astropy\n").unwrap();
        git_cmd(dir.path(), &["add", "-A"]);
        git_cmd(dir.path(), &["commit", "-m", "fixture"]);
        dir
    }

    #[test]
    fn test_eight_of_ten_is_ready() {
        let repo = make_repo_8_of_10();
        let report = assess_with_gh(repo.path(), false);
        assert_eq!(report.score(), 8);
        assert_eq!(report.percent(), 80);
        assert_eq!(report.band(), Band::Ready);
        assert!(report.render().contains("ready for migration"));
    }

    #[test]
    fn test_seven_of_ten_is_mostly_ready() {
        let repo = make_repo_8_of_10();
        std::fs::remove_file(repo.path().join("_toc.yml")).unwrap();
        // Keep the tree clean after removing the file.
        git_cmd(repo.path(), &["add", "-A"]);
        git_cmd(repo.path(), &["commit", "-m", "drop toc"]);

        let report = assess_with_gh(repo.path(), false);
        assert_eq!(report.score(), 7);
        assert_eq!(report.percent(), 70);
        assert_eq!(report.band(), Band::MostlyReady);
    }

    #[test]
    fn test_bare_directory_needs_work() {
        let dir = tempfile::tempdir().unwrap();
        let report = assess_with_gh(dir.path(), false);
        assert!(report.percent() < 60);
        assert_eq!(report.band(), Band::NeedsWork);
    }

    #[test]
    fn test_render_lists_missing_checks() {
        let dir = tempfile::tempdir().unwrap();
        let rendered = assess_with_gh(dir.path(), false).render();
        assert!(rendered.contains("MISSING"));
        assert!(rendered.contains("_toc.yml"));
    }
}
