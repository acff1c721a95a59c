//! Pipeline configuration and identity.
//!
//! The original shell pipeline read its options from ambient environment
//! variables at each use site. Here configuration is captured once, at the
//! CLI boundary, into an immutable [`PipelineConfig`] that every stage
//! receives explicitly.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{NbciError, Result};

/// Notebook execution mode for the pipeline's execute stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Validate notebooks against embedded outputs; never re-execute.
    #[default]
    ValidationOnly,

    /// Re-execute only the first three notebooks in discovery order.
    Quick,

    /// Re-execute every notebook.
    Full,
}

impl ExecutionMode {
    /// The mode's wire name as used by the workflow inputs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::ValidationOnly => "validation-only",
            ExecutionMode::Quick => "quick",
            ExecutionMode::Full => "full",
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = NbciError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "validation-only" => Ok(ExecutionMode::ValidationOnly),
            "quick" => Ok(ExecutionMode::Quick),
            "full" => Ok(ExecutionMode::Full),
            other => Err(NbciError::UnknownExecutionMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Repository root the pipeline operates on.
    pub workdir: PathBuf,

    /// Target Python interpreter version (informational; the system
    /// `python3` is what actually backs the venv).
    pub python_version: String,

    /// Notebook execution mode.
    pub execution_mode: ExecutionMode,

    /// Restrict validation/execution to a single notebook path.
    pub single_notebook: Option<PathBuf>,

    /// Whether the bandit security scan stage runs.
    pub run_security_scan: bool,

    /// Whether the jupyter-book documentation build stage runs.
    pub build_documentation: bool,

    /// Assume the toolchain is already installed.
    pub skip_deps: bool,
}

impl PipelineConfig {
    /// Build a configuration with the original scripts' defaults.
    pub fn new(workdir: PathBuf) -> Self {
        Self {
            workdir,
            python_version: "3.11".to_string(),
            execution_mode: ExecutionMode::ValidationOnly,
            single_notebook: None,
            run_security_scan: true,
            build_documentation: true,
            skip_deps: false,
        }
    }

    /// Base name of the working directory, used as the repository identity
    /// key for profile lookup.
    pub fn repo_name(&self) -> String {
        self.workdir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Path to the isolated environment directory.
    pub fn venv_dir(&self) -> PathBuf {
        self.workdir.join("venv")
    }

    /// Path to an executable inside the isolated environment.
    pub fn venv_bin(&self, tool: &str) -> PathBuf {
        self.venv_dir().join("bin").join(tool)
    }

    /// Path to the conventional notebooks directory.
    pub fn notebooks_dir(&self) -> PathBuf {
        self.workdir.join("notebooks")
    }

    /// The base environment overlay applied to every spawned command:
    /// the CI markers the workflows expect, unbuffered Python output.
    pub fn base_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("CI".to_string(), "true".to_string());
        env.insert("GITHUB_ACTIONS".to_string(), "true".to_string());
        env.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());
        env
    }

    /// SHA-256 digest of the canonical JSON form of this configuration.
    ///
    /// Recorded in the run report so two runs with identical settings can
    /// be linked.
    pub fn digest(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&json);
        hex::encode(hasher.finalize())
    }
}
