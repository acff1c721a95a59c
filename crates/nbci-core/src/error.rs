//! Error taxonomy for the notebook CI toolkit.

/// Errors produced by nbci operations.
///
/// Variants map to the pipeline's fatal conditions; recoverable conditions
/// are recorded on the [`crate::report::RunReport`] instead of raised here.
#[derive(Debug, thiserror::Error)]
pub enum NbciError {
    #[error("required tool not found on PATH: {0}")]
    ToolMissing(String),

    #[error("not inside a git repository: {0}")]
    NotAGitRepo(String),

    #[error("environment provisioning failed: {0}")]
    Provisioning(String),

    #[error("core tool installation failed: {0}")]
    InstallFailed(String),

    #[error("notebook not found: {0}")]
    NotebookNotFound(String),

    #[error("unknown execution mode: {0}")]
    UnknownExecutionMode(String),

    #[error("documentation build failed: {0}")]
    DocsBuildFailed(String),

    #[error("template download failed: {url}: {reason}")]
    TemplateDownload { url: String, reason: String },

    #[error("workflow file error: {0}")]
    Workflow(String),

    #[error("git error: {0}")]
    GitError(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for nbci operations.
pub type Result<T> = std::result::Result<T, NbciError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NbciError::ToolMissing("python3".to_string());
        assert!(err.to_string().contains("python3"));

        let err = NbciError::NotebookNotFound("notebooks/a.ipynb".to_string());
        assert!(err.to_string().contains("notebook not found"));

        let err = NbciError::TemplateDownload {
            url: "https://example/wf.yml".to_string(),
            reason: "404".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("wf.yml"));
        assert!(msg.contains("404"));
    }
}
