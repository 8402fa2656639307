//! AI-ignore resolution: cached configuration parsing and per-file
//! evaluation with provenance attribution.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::warn;

use crate::aggregator;
use crate::aggregator::AiIgnoreConfig;
use crate::cache::AiIgnoreCache;
use crate::pattern::evaluate_patterns;
use crate::settings;
use crate::settings::SchemaValidation;
use crate::sources::AiSourceKind;
use crate::workspace::WorkspaceSet;
use crate::workspace::file_key;
use crate::workspace::workspace_key;

/// Sink for the single user-facing message emitted per configuration
/// reload. Injectable so an embedding UI can surface it; the default logs
/// through `tracing`.
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

/// Default notifier: structured warning log, no UI.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_error(&self, message: &str) {
        warn!(message, "AI ignore configuration error");
    }
}

/// Per-file AI-ignore evaluation result.
#[derive(Debug, Clone)]
pub struct AiIgnoreStatus {
    pub path: PathBuf,
    pub is_ignored: bool,
    /// Patterns that matched during evaluation, in list order.
    pub matched_patterns: Vec<String>,
    /// Provenance of the decisive match, when ignored.
    pub source: Option<AiSourceKind>,
    pub evaluated_at: SystemTime,
    /// Key this status is cached under; absent when the path was not
    /// cacheable (outside every workspace root).
    pub cache_key: Option<String>,
}

impl AiIgnoreStatus {
    fn not_ignored(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            is_ignored: false,
            matched_patterns: Vec::new(),
            source: None,
            evaluated_at: SystemTime::now(),
            cache_key: None,
        }
    }
}

pub type ResolverCache = AiIgnoreCache<AiIgnoreStatus, AiIgnoreConfig>;

/// Orchestrates aggregation, schema validation, caching, and per-file
/// evaluation of AI-ignore state.
pub struct AiIgnoreResolver {
    workspaces: WorkspaceSet,
    cache: Arc<ResolverCache>,
    notifier: Arc<dyn Notifier>,
}

impl AiIgnoreResolver {
    pub fn new(workspaces: WorkspaceSet) -> Self {
        Self::with_cache(workspaces, Arc::new(ResolverCache::default()))
    }

    pub fn with_cache(workspaces: WorkspaceSet, cache: Arc<ResolverCache>) -> Self {
        Self {
            workspaces,
            cache,
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Shared handle to the cache, for wiring up a config watcher.
    pub fn cache(&self) -> Arc<ResolverCache> {
        Arc::clone(&self.cache)
    }

    pub fn workspaces(&self) -> &WorkspaceSet {
        &self.workspaces
    }

    /// Parse (or fetch cached) AI-ignore configuration for a workspace.
    ///
    /// On a miss, schema validation and aggregation both run; schema and
    /// per-source provenance errors merge into one deduplicated
    /// validation-error list and trigger a single notification. A hard
    /// aggregation failure degrades to an empty invalid config instead of
    /// propagating. Both outcomes are cached, so repeated identical
    /// failures stay silent until invalidation forces a rebuild.
    pub async fn parse_config(&self, workspace_root: &Path) -> AiIgnoreConfig {
        let cache_key = workspace_key(workspace_root);
        if let Some(cached) = self.cache.get_workspace(&cache_key) {
            return cached;
        }

        let schema = settings::validate_settings_schema(workspace_root).await;

        let config = match aggregator::aggregate(workspace_root).await {
            Ok(mut aggregated) => {
                let errors = collect_errors(&aggregated, &schema);
                if !errors.is_empty() {
                    aggregated.is_valid = false;
                    aggregated.validation_errors = errors;
                    aggregated.last_updated = SystemTime::now();
                    self.notify_errors(&aggregated.validation_errors);
                }
                aggregated
            }
            Err(err) => {
                warn!(
                    workspace = %workspace_root.display(),
                    error = %err,
                    "failed to aggregate AI ignore config"
                );
                AiIgnoreConfig::invalid(workspace_root, err.to_string())
            }
        };

        self.cache
            .set_workspace(cache_key, config.clone(), None);
        config
    }

    /// Shorthand verdict for one path.
    pub async fn is_ignored_for_ai(&self, path: &Path) -> bool {
        self.status(path).await.is_ignored
    }

    /// Evaluate AI-ignore status for one path, cache-first.
    ///
    /// Paths outside every workspace root (or without a computable
    /// relative form) get a non-ignored default and are not cached.
    pub async fn status(&self, path: &Path) -> AiIgnoreStatus {
        let Some(root) = self.workspaces.owning_root(path) else {
            return AiIgnoreStatus::not_ignored(path);
        };
        let root = root.to_path_buf();
        let Some(relative) = self.workspaces.relative_path(path) else {
            return AiIgnoreStatus::not_ignored(path);
        };

        let key = file_key(&root, &relative);
        if let Some(cached) = self.cache.get_file(&key) {
            return cached;
        }

        let config = self.parse_config(&root).await;
        let evaluation = evaluate_patterns(&relative, &config.patterns);
        let source = decisive_source(&config, &evaluation.matched_patterns);

        let status = AiIgnoreStatus {
            path: path.to_path_buf(),
            is_ignored: evaluation.ignored,
            matched_patterns: evaluation.matched_patterns,
            source,
            evaluated_at: SystemTime::now(),
            cache_key: Some(key.clone()),
        };

        self.cache.set_file(key, status.clone(), None);
        status
    }

    fn notify_errors(&self, errors: &[String]) {
        let Some(first) = errors.first() else {
            return;
        };
        let message = if errors.len() == 1 {
            first.clone()
        } else {
            format!(
                "AI ignore config partially loaded: {} patterns invalid. First: {first}",
                errors.len()
            )
        };
        warn!(?errors, "AI ignore configuration errors");
        self.notifier.notify_error(&message);
    }
}

/// Attribute the decisive match to the first provenance source (in
/// aggregation order) whose pattern list contains any matched pattern
/// string. With duplicate patterns across sources this credits the
/// earlier source, whose copy is the one that survived deduplication.
fn decisive_source(config: &AiIgnoreConfig, matched_patterns: &[String]) -> Option<AiSourceKind> {
    for pattern in matched_patterns {
        let hit = config
            .sources
            .iter()
            .find(|source| source.patterns.iter().any(|p| p == pattern));
        if let Some(source) = hit {
            return Some(source.kind);
        }
    }
    None
}

/// Merge schema errors, aggregation validation errors, and per-source
/// provenance errors into one set-deduplicated list.
fn collect_errors(config: &AiIgnoreConfig, schema: &SchemaValidation) -> Vec<String> {
    let mut merged = Vec::new();
    let mut push = |entry: String| {
        if !merged.contains(&entry) {
            merged.push(entry);
        }
    };

    if !schema.valid {
        for error in &schema.errors {
            push(error.clone());
        }
    }
    for error in &config.validation_errors {
        push(error.clone());
    }
    for source in &config.sources {
        let file = source
            .file_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| source.kind.agent_name().to_owned());
        for error in &source.errors {
            push(format!("Failed to read agent config: {file} - {error}"));
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                messages: Mutex::new(Vec::new()),
            })
        }

        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify_error(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_owned());
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn resolver_for(dir: &TempDir) -> AiIgnoreResolver {
        AiIgnoreResolver::new(WorkspaceSet::single(dir.path()))
    }

    #[tokio::test]
    async fn path_outside_workspace_is_not_ignored_and_not_cached() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver_for(&dir);

        let status = resolver.status(Path::new("/elsewhere/file.txt")).await;
        assert!(!status.is_ignored);
        assert!(status.cache_key.is_none());
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn ignored_file_is_attributed_to_its_source() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            ".claude/settings.json",
            r#"{"permissions": {"deny": ["Read(./secrets/**)"]}}"#,
        );
        let resolver = resolver_for(&dir);

        let status = resolver.status(&dir.path().join("secrets/key.pem")).await;
        assert!(status.is_ignored);
        assert_eq!(status.matched_patterns, vec!["secrets/**".to_owned()]);
        assert_eq!(status.source, Some(AiSourceKind::Claude));
        assert!(status.cache_key.is_some());
    }

    #[tokio::test]
    async fn duplicate_pattern_attributes_to_earlier_source() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            ".pathveil/settings.json",
            r#"{"aiIgnore": ["secrets/**"]}"#,
        );
        write(dir.path(), ".aiexclude", "secrets/**\n");
        let resolver = resolver_for(&dir);

        let status = resolver.status(&dir.path().join("secrets/key.pem")).await;
        assert_eq!(status.source, Some(AiSourceKind::WorkspaceSettings));
    }

    #[tokio::test]
    async fn status_is_served_from_file_cache_until_invalidated() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".aiexclude", "secrets/**\n");
        let resolver = resolver_for(&dir);

        let first = resolver.status(&dir.path().join("secrets/key.pem")).await;
        assert!(first.is_ignored);

        // Changing the file on disk is invisible while cached.
        std::fs::remove_file(dir.path().join(".aiexclude")).unwrap();
        let second = resolver.status(&dir.path().join("secrets/key.pem")).await;
        assert!(second.is_ignored);

        let key = workspace_key(dir.path());
        resolver
            .cache()
            .invalidate(crate::cache::CacheLevel::Workspace, Some(&key));
        let third = resolver.status(&dir.path().join("secrets/key.pem")).await;
        assert!(!third.is_ignored);
    }

    #[tokio::test]
    async fn schema_and_provenance_errors_merge_with_single_notification() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            ".pathveil/settings.json",
            r#"{"aiIgnore": [], "bogusKey": 1}"#,
        );
        write(dir.path(), ".claude/settings.json", "{ broken");
        let notifier = RecordingNotifier::new();
        let resolver = resolver_for(&dir).with_notifier(notifier.clone());

        let config = resolver.parse_config(dir.path()).await;
        assert!(!config.is_valid);
        assert!(
            config
                .validation_errors
                .iter()
                .any(|e| e == "Unknown pathveil setting: bogusKey")
        );
        assert!(
            config
                .validation_errors
                .iter()
                .any(|e| e.starts_with("Failed to read agent config:"))
        );

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("patterns invalid"));

        // Cached: a second parse does not re-notify.
        resolver.parse_config(dir.path()).await;
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn single_error_is_notified_verbatim() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".aiexclude", "!\n");
        let notifier = RecordingNotifier::new();
        let resolver = resolver_for(&dir).with_notifier(notifier.clone());

        resolver.parse_config(dir.path()).await;
        let messages = notifier.messages();
        assert_eq!(
            messages,
            vec!["!: Negation pattern must include a rule".to_owned()]
        );
    }

    #[tokio::test]
    async fn hard_aggregation_failure_degrades_to_empty_invalid_config() {
        let missing = Path::new("/definitely/not/a/real/root");
        let resolver = AiIgnoreResolver::new(WorkspaceSet::single(missing));

        let config = resolver.parse_config(missing).await;
        assert!(!config.is_valid);
        assert!(config.patterns.is_empty());
        assert_eq!(config.validation_errors.len(), 1);
    }
}
