//! Workspace root tracking and workspace-relative path resolution.

use std::path::Path;
use std::path::PathBuf;

use crate::pattern::normalize_path;

/// The set of workspace roots known to the resolvers.
///
/// Mirrors a multi-root editor workspace: a path belongs to the most
/// specific (longest) root that contains it.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSet {
    roots: Vec<PathBuf>,
}

impl WorkspaceSet {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn single(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The root owning `path`, if any. The longest matching root wins so
    /// nested roots resolve to the inner workspace.
    pub fn owning_root(&self, path: &Path) -> Option<&Path> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    /// Workspace-relative form of `path`, normalized for pattern matching.
    ///
    /// Returns `None` when the path lies outside every root or equals a
    /// root itself (an empty relative path is not matchable).
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let root = self.owning_root(path)?;
        relative_to(root, path)
    }
}

/// Normalized relative path of `path` under `root`, or `None` if it is not
/// inside `root`.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = pathdiff::diff_paths(path, root)?;
    let rel = rel.to_string_lossy();
    if rel.is_empty() || rel.starts_with("..") {
        return None;
    }
    Some(normalize_path(&rel))
}

/// Cache key identifying one workspace root.
pub fn workspace_key(root: &Path) -> String {
    normalize_path(&root.to_string_lossy())
}

/// Cache key identifying one file within a workspace.
pub fn file_key(root: &Path, relative_path: &str) -> String {
    format!("{}:{relative_path}", workspace_key(root))
}
