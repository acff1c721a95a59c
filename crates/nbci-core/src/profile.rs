//! Repository-specific behavior table.
//!
//! Several notebook repositories need extra setup before their notebooks
//! can run (calibration caches, optional instrument packages) and carry
//! different workflow inputs after migration. All of that is expressed as
//! data here: a `RepoProfile` record looked up by the repository's
//! directory name, so adding a repository never touches stage code.

use crate::config::ExecutionMode;

/// Repository-specific configuration applied on top of the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoProfile {
    /// Environment variables added to the run overlay (calibration server
    /// URLs, cache paths).
    pub env: &'static [(&'static str, &'static str)],

    /// Python module whose importability is smoke-tested after installs.
    pub probe_import: Option<&'static str>,

    /// Post-run script referenced by the migrated workflows.
    pub post_run_script: Option<&'static str>,

    /// Python version override written into migrated workflows.
    pub python_version: Option<&'static str>,

    /// Execution-mode override written into migrated workflows.
    pub execution_mode: Option<ExecutionMode>,

    /// Whether the security scan runs for this repository.
    pub security_scan: bool,
}

impl Default for RepoProfile {
    fn default() -> Self {
        Self {
            env: &[],
            probe_import: None,
            post_run_script: None,
            python_version: None,
            execution_mode: None,
            security_scan: true,
        }
    }
}

const DEFAULT_PROFILE: RepoProfile = RepoProfile {
    env: &[],
    probe_import: None,
    post_run_script: None,
    python_version: None,
    execution_mode: None,
    security_scan: true,
};

/// Known repositories and their profiles.
///
/// Lookup is exact-string-match; anything else gets the default profile.
static PROFILES: &[(&str, RepoProfile)] = &[
    (
        "hst_notebooks",
        RepoProfile {
            env: &[
                ("CRDS_SERVER_URL", "https://hst-crds.stsci.edu"),
                ("CRDS_PATH", "/tmp/crds_cache"),
            ],
            probe_import: Some("stistools"),
            post_run_script: None,
            python_version: Some("3.11"),
            execution_mode: None,
            security_scan: true,
        },
    ),
    (
        "jdat_notebooks",
        RepoProfile {
            env: &[
                ("CRDS_SERVER_URL", "https://jwst-crds.stsci.edu"),
                ("CRDS_PATH", "/tmp/crds_cache"),
            ],
            probe_import: Some("jwst"),
            post_run_script: None,
            python_version: Some("3.11"),
            execution_mode: None,
            security_scan: true,
        },
    ),
    (
        "jwst-pipeline-notebooks",
        RepoProfile {
            env: &[
                ("CRDS_SERVER_URL", "https://jwst-crds.stsci.edu"),
                ("CRDS_PATH", "/tmp/crds_cache"),
            ],
            probe_import: Some("jwst"),
            post_run_script: Some("scripts/jdaviz_image_replacement.sh"),
            python_version: Some("3.11"),
            execution_mode: None,
            security_scan: true,
        },
    ),
    (
        "mast_notebooks",
        RepoProfile {
            env: &[],
            probe_import: Some("astroquery"),
            post_run_script: None,
            python_version: None,
            execution_mode: None,
            security_scan: true,
        },
    ),
    (
        "hello_universe",
        RepoProfile {
            env: &[],
            probe_import: None,
            post_run_script: None,
            python_version: None,
            // Educational repository: notebooks are illustrative, never
            // re-executed in CI, and the scan is disabled.
            execution_mode: Some(ExecutionMode::ValidationOnly),
            security_scan: false,
        },
    ),
];

/// Look up the profile for a repository name.
///
/// Unknown names fall through to the default (no special behavior).
pub fn repo_profile(repo_name: &str) -> &'static RepoProfile {
    PROFILES
        .iter()
        .find(|(name, _)| *name == repo_name)
        .map(|(_, profile)| profile)
        .unwrap_or(&DEFAULT_PROFILE)
}

/// Names of all repositories with a non-default profile.
pub fn known_repos() -> Vec<&'static str> {
    PROFILES.iter().map(|(name, _)| *name).collect()
}
