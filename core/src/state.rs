//! Effective-state resolution across every exclusion source.
//!
//! Sources are consulted concurrently but ranked deterministically:
//! structured configs outrank ignore files, which outrank workspace
//! settings. The first matching source in rank order owns the verdict;
//! every matching source is still reported.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::config_targets;
use crate::ignore_files;
use crate::pattern::matches_any;
use crate::settings;
use crate::sources::Source;
use crate::workspace::WorkspaceSet;

/// One path's resolved exclusion state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveState {
    pub path: PathBuf,
    pub excluded: bool,
    /// Set only by multi-path aggregation when members disagree.
    pub mixed: bool,
    /// Highest-ranked source that excluded the path.
    pub source: Option<Source>,
    /// Every source that excluded the path, in rank order.
    pub sources_applied: Vec<Source>,
}

impl EffectiveState {
    fn neutral(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            excluded: false,
            mixed: false,
            source: None,
            sources_applied: Vec::new(),
        }
    }
}

/// One consultable exclusion source: a ranked identity plus an async
/// membership predicate over workspace-relative paths.
#[async_trait]
pub trait ExclusionSource: Send + Sync {
    fn source(&self) -> Source;
    async fn excludes(&self, workspace_root: &Path, relative_path: &str) -> bool;
}

struct TsconfigSource;

#[async_trait]
impl ExclusionSource for TsconfigSource {
    fn source(&self) -> Source {
        Source::ConfigTsconfig
    }

    async fn excludes(&self, workspace_root: &Path, relative_path: &str) -> bool {
        let config = workspace_root.join(config_targets::TSCONFIG_FILE);
        let patterns = config_targets::tsconfig_exclude_patterns(&config).await;
        matches_any(relative_path, &patterns)
    }
}

struct EslintConfigSource;

#[async_trait]
impl ExclusionSource for EslintConfigSource {
    fn source(&self) -> Source {
        Source::ConfigEslint
    }

    async fn excludes(&self, workspace_root: &Path, relative_path: &str) -> bool {
        let config = workspace_root.join(config_targets::ESLINT_CONFIG_FILE);
        let patterns = config_targets::eslint_ignore_patterns(&config).await;
        matches_any(relative_path, &patterns)
    }
}

struct PrettierConfigSource;

#[async_trait]
impl ExclusionSource for PrettierConfigSource {
    fn source(&self) -> Source {
        Source::ConfigPrettier
    }

    async fn excludes(&self, workspace_root: &Path, relative_path: &str) -> bool {
        for candidate in config_targets::PRETTIER_CONFIG_FILES {
            let config = workspace_root.join(candidate);
            if !config_targets::is_file(&config).await {
                continue;
            }
            let patterns = config_targets::prettier_excluded_files(&config).await;
            return matches_any(relative_path, &patterns);
        }
        false
    }
}

struct IgnoreFileSource {
    source: Source,
    file_name: &'static str,
}

#[async_trait]
impl ExclusionSource for IgnoreFileSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn excludes(&self, workspace_root: &Path, relative_path: &str) -> bool {
        ignore_files::ignore_file_excludes(&workspace_root.join(self.file_name), relative_path)
            .await
    }
}

struct WorkspaceSettingsSource;

#[async_trait]
impl ExclusionSource for WorkspaceSettingsSource {
    fn source(&self) -> Source {
        Source::WorkspaceSettings
    }

    async fn excludes(&self, workspace_root: &Path, relative_path: &str) -> bool {
        let patterns = settings::ai_ignore_patterns(workspace_root).await;
        matches_any(relative_path, &patterns)
    }
}

/// Resolves effective exclusion states by consulting every registered
/// source and applying rank-order precedence.
pub struct StateResolver {
    workspaces: WorkspaceSet,
    sources: Vec<Arc<dyn ExclusionSource>>,
}

impl StateResolver {
    /// Build a resolver over an explicit source list. The list is
    /// re-sorted by source rank so callers cannot perturb precedence.
    pub fn new(workspaces: WorkspaceSet, mut sources: Vec<Arc<dyn ExclusionSource>>) -> Self {
        sources.sort_by_key(|source| source.source().rank());
        Self {
            workspaces,
            sources,
        }
    }

    /// The full built-in source set: structured configs, every supported
    /// ignore file, and workspace settings.
    pub fn with_default_sources(workspaces: WorkspaceSet) -> Self {
        let mut sources: Vec<Arc<dyn ExclusionSource>> = vec![
            Arc::new(TsconfigSource),
            Arc::new(EslintConfigSource),
            Arc::new(PrettierConfigSource),
            Arc::new(WorkspaceSettingsSource),
        ];
        for (source, file_name) in ignore_files::IGNORE_FILES {
            sources.push(Arc::new(IgnoreFileSource {
                source: *source,
                file_name,
            }));
        }
        Self::new(workspaces, sources)
    }

    pub fn workspaces(&self) -> &WorkspaceSet {
        &self.workspaces
    }

    /// Resolve one path. Paths outside every workspace root resolve to
    /// the neutral default.
    pub async fn resolve_state(&self, path: &Path) -> EffectiveState {
        let Some(root) = self.workspaces.owning_root(path) else {
            return EffectiveState::neutral(path);
        };
        let Some(relative) = self.workspaces.relative_path(path) else {
            return EffectiveState::neutral(path);
        };

        let checks = self
            .sources
            .iter()
            .map(|source| source.excludes(root, &relative));
        let verdicts = join_all(checks).await;

        let sources_applied: Vec<Source> = self
            .sources
            .iter()
            .zip(verdicts)
            .filter(|(_, excluded)| *excluded)
            .map(|(source, _)| source.source())
            .collect();

        EffectiveState {
            path: path.to_path_buf(),
            excluded: !sources_applied.is_empty(),
            mixed: false,
            source: sources_applied.first().copied(),
            sources_applied,
        }
    }

    /// Resolve a group of paths into one aggregate state.
    ///
    /// A unanimous group inherits the first member's state with the
    /// union of all members' applied sources. A split group is marked
    /// mixed with no owning source; its `excluded` flag follows the
    /// majority of members.
    pub async fn resolve_states(&self, paths: &[PathBuf]) -> EffectiveState {
        match paths {
            [] => EffectiveState::neutral(Path::new("")),
            [single] => self.resolve_state(single).await,
            _ => {
                let states = join_all(paths.iter().map(|path| self.resolve_state(path))).await;
                let excluded_count = states.iter().filter(|state| state.excluded).count();

                if excluded_count == 0 || excluded_count == states.len() {
                    let mut union: Vec<Source> = Vec::new();
                    for state in &states {
                        for source in &state.sources_applied {
                            if !union.contains(source) {
                                union.push(*source);
                            }
                        }
                    }
                    union.sort_by_key(|source| source.rank());
                    let first = &states[0];
                    return EffectiveState {
                        path: first.path.clone(),
                        excluded: first.excluded,
                        mixed: false,
                        source: first.source,
                        sources_applied: union,
                    };
                }

                EffectiveState {
                    path: states[0].path.clone(),
                    excluded: excluded_count > states.len() - excluded_count,
                    mixed: true,
                    source: None,
                    sources_applied: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn resolver(dir: &TempDir) -> StateResolver {
        StateResolver::with_default_sources(WorkspaceSet::single(dir.path()))
    }

    #[tokio::test]
    async fn path_outside_workspace_is_neutral() {
        let dir = TempDir::new().unwrap();
        let state = resolver(&dir).resolve_state(Path::new("/elsewhere/x.ts")).await;
        assert!(!state.excluded);
        assert!(state.source.is_none());
        assert!(state.sources_applied.is_empty());
    }

    #[tokio::test]
    async fn unmatched_path_is_not_excluded() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", "target\n");
        let state = resolver(&dir)
            .resolve_state(&dir.path().join("src/main.ts"))
            .await;
        assert!(!state.excluded);
    }

    #[tokio::test]
    async fn config_source_outranks_ignore_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "tsconfig.json", r#"{"exclude": ["dist/**"]}"#);
        write(dir.path(), ".gitignore", "dist/**\n");

        let state = resolver(&dir)
            .resolve_state(&dir.path().join("dist/app.js"))
            .await;
        assert!(state.excluded);
        assert_eq!(state.source, Some(Source::ConfigTsconfig));
        assert_eq!(
            state.sources_applied,
            vec![Source::ConfigTsconfig, Source::IgnoreFileGit]
        );
    }

    #[tokio::test]
    async fn ignore_file_outranks_workspace_settings() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".prettierignore", "gen/**\n");
        write(
            dir.path(),
            ".pathveil/settings.json",
            r#"{"aiIgnore": ["gen/**"]}"#,
        );

        let state = resolver(&dir)
            .resolve_state(&dir.path().join("gen/out.css"))
            .await;
        assert_eq!(state.source, Some(Source::IgnoreFilePrettier));
        assert_eq!(
            state.sources_applied,
            vec![Source::IgnoreFilePrettier, Source::WorkspaceSettings]
        );
    }

    #[tokio::test]
    async fn caller_supplied_source_order_is_normalized_by_rank() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", "dist/**\n");
        write(dir.path(), "tsconfig.json", r#"{"exclude": ["dist/**"]}"#);

        // Deliberately register the lower-ranked source first.
        let resolver = StateResolver::new(
            WorkspaceSet::single(dir.path()),
            vec![
                Arc::new(IgnoreFileSource {
                    source: Source::IgnoreFileGit,
                    file_name: ".gitignore",
                }),
                Arc::new(TsconfigSource),
            ],
        );
        let state = resolver.resolve_state(&dir.path().join("dist/app.js")).await;
        assert_eq!(state.source, Some(Source::ConfigTsconfig));
    }

    #[tokio::test]
    async fn empty_group_resolves_neutral() {
        let dir = TempDir::new().unwrap();
        let state = resolver(&dir).resolve_states(&[]).await;
        assert!(!state.excluded);
        assert!(!state.mixed);
    }

    #[tokio::test]
    async fn unanimous_group_unions_applied_sources() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", "a.ts\n");
        write(dir.path(), ".npmignore", "b.ts\n");

        let state = resolver(&dir)
            .resolve_states(&[dir.path().join("a.ts"), dir.path().join("b.ts")])
            .await;
        assert!(state.excluded);
        assert!(!state.mixed);
        assert_eq!(state.source, Some(Source::IgnoreFileGit));
        assert_eq!(
            state.sources_applied,
            vec![Source::IgnoreFileGit, Source::IgnoreFileNpm]
        );
    }

    #[tokio::test]
    async fn split_group_is_mixed_with_majority_exclusion() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", "a.ts\nb.ts\n");

        let state = resolver(&dir)
            .resolve_states(&[
                dir.path().join("a.ts"),
                dir.path().join("b.ts"),
                dir.path().join("c.ts"),
            ])
            .await;
        assert!(state.mixed);
        assert!(state.excluded);
        assert!(state.source.is_none());
        assert!(state.sources_applied.is_empty());

        let minority = resolver(&dir)
            .resolve_states(&[
                dir.path().join("a.ts"),
                dir.path().join("c.ts"),
                dir.path().join("d.ts"),
            ])
            .await;
        assert!(minority.mixed);
        assert!(!minority.excluded);
    }
}
