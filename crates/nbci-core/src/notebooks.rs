//! Notebook discovery and failure-marker naming.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Suffix inserted before the extension of a notebook whose execution
/// failed or timed out.
pub const FAILED_MARKER: &str = "_failed";

/// Recursively collect `*.ipynb` files under a directory, sorted for
/// deterministic ordering. Failure-marker copies are excluded so a re-run
/// never validates or executes a previous run's artifacts.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_notebooks(dir, &mut found)?;
    found.retain(|p| !is_failed_marker(p));
    found.sort();
    Ok(found)
}

/// Collect the failure-marker copies left behind by earlier runs.
pub fn discover_failed(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_notebooks(dir, &mut found)?;
    found.retain(|p| is_failed_marker(p));
    found.sort();
    Ok(found)
}

fn collect_notebooks(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            // Jupyter checkpoints hold stale notebook copies.
            if path.file_name().is_some_and(|n| n == ".ipynb_checkpoints") {
                continue;
            }
            collect_notebooks(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "ipynb") {
            out.push(path);
        }
    }
    Ok(())
}

/// Whether a path carries the failure marker.
pub fn is_failed_marker(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().ends_with(FAILED_MARKER))
        .unwrap_or(false)
}

/// Derive the failure-marker path for a notebook:
/// `notebooks/a.ipynb` -> `notebooks/a_failed.ipynb`.
pub fn failed_marker_path(notebook: &Path) -> PathBuf {
    let stem = notebook
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    notebook.with_file_name(format!("{stem}{FAILED_MARKER}.ipynb"))
}

/// The plain-script path nbconvert produces for a notebook
/// (`a.ipynb` -> `a.py`), used by the security scan's cleanup.
pub fn script_path(notebook: &Path) -> PathBuf {
    notebook.with_extension("py")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    #[test]
    fn test_discover_sorted_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.ipynb"));
        touch(&dir.path().join("sub/c.ipynb"));
        touch(&dir.path().join("a.ipynb"));
        touch(&dir.path().join("readme.md"));

        let found = discover(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.ipynb"),
                PathBuf::from("b.ipynb"),
                PathBuf::from("sub/c.ipynb"),
            ]
        );
    }

    #[test]
    fn test_discover_excludes_failed_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.ipynb"));
        touch(&dir.path().join("a_failed.ipynb"));
        touch(&dir.path().join(".ipynb_checkpoints/a-checkpoint.ipynb"));

        let found = discover(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("a.ipynb")]);

        let failed = discover_failed(dir.path()).unwrap();
        assert_eq!(failed, vec![dir.path().join("a_failed.ipynb")]);
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let found = discover(Path::new("/nonexistent/notebooks")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_failed_marker_path() {
        assert_eq!(
            failed_marker_path(Path::new("notebooks/a.ipynb")),
            PathBuf::from("notebooks/a_failed.ipynb")
        );
    }

    #[test]
    fn test_script_path() {
        assert_eq!(
            script_path(Path::new("notebooks/a.ipynb")),
            PathBuf::from("notebooks/a.py")
        );
    }
}
