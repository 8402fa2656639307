//! Filesystem watcher for AI-ignore configuration files.
//!
//! Watches each registered workspace root for changes to the canonical
//! config paths. A relevant change invalidates that workspace's cache
//! prefix (cascading to its file-level entries) and broadcasts a change
//! event to subscribers. Config directories that do not exist at
//! registration time are picked up when their creation event arrives, so
//! a `.claude/settings.json` written into a brand-new `.claude/` still
//! invalidates.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;

use notify::RecursiveMode;
use notify::Watcher;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::warn;

use crate::cache::CacheLevel;
use crate::error::Result;
use crate::resolver::ResolverCache;
use crate::workspace::workspace_key;

const CHANNEL_CAPACITY: usize = 64;

/// Workspace-relative paths whose changes trigger a config rebuild.
pub const WATCHED_CONFIG_FILES: &[&str] = &[
    ".pathveil/settings.json",
    ".claude/settings.json",
    ".aiexclude",
];

/// A batch of config changes attributed to one workspace.
#[derive(Debug, Clone)]
pub struct ConfigChangeEvent {
    pub workspace_root: PathBuf,
    pub changed_paths: Vec<PathBuf>,
}

/// Live watcher over AI-ignore config files.
///
/// Dropping the watcher stops the event loop once the OS watcher's
/// channel closes.
pub struct ConfigWatcher {
    watcher: Option<Arc<Mutex<notify::RecommendedWatcher>>>,
    roots: Arc<Mutex<Vec<PathBuf>>>,
    tx: broadcast::Sender<ConfigChangeEvent>,
}

impl ConfigWatcher {
    /// Start a watcher whose events invalidate `cache`. Must be called
    /// from within a Tokio runtime.
    pub fn new(cache: Arc<ResolverCache>) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })?;
        let watcher = Arc::new(Mutex::new(watcher));
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let roots = Arc::new(Mutex::new(Vec::new()));

        // The loop holds the watcher weakly so dropping this handle still
        // closes the raw channel and ends the loop.
        spawn_event_loop(
            raw_rx,
            tx.clone(),
            cache,
            roots.clone(),
            Arc::downgrade(&watcher),
        );

        Ok(Self {
            watcher: Some(watcher),
            roots,
            tx,
        })
    }

    /// A watcher that never fires. `watch_workspace` is a safe no-op.
    pub fn noop() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            watcher: None,
            roots: Arc::new(Mutex::new(Vec::new())),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChangeEvent> {
        self.tx.subscribe()
    }

    /// Register a workspace root. The root itself is watched for the
    /// top-level config files; config directories that already exist are
    /// watched too, and ones created later are added by the event loop.
    pub fn watch_workspace(&self, workspace_root: &Path) {
        let Some(watcher) = &self.watcher else {
            return;
        };
        {
            let mut roots = lock(&self.roots);
            if roots.iter().any(|root| root == workspace_root) {
                return;
            }
            roots.push(workspace_root.to_path_buf());
        }

        let mut targets = vec![workspace_root.to_path_buf()];
        for dir in config_dirs(workspace_root) {
            if dir.is_dir() {
                targets.push(dir);
            }
        }
        let mut guard = lock(watcher);
        for target in targets {
            if let Err(err) = guard.watch(&target, RecursiveMode::NonRecursive) {
                warn!("failed to watch {}: {err}", target.display());
            }
        }
    }

    /// Deregister a workspace root and stop watching its paths.
    pub fn unwatch_workspace(&self, workspace_root: &Path) {
        let Some(watcher) = &self.watcher else {
            return;
        };
        {
            let mut roots = lock(&self.roots);
            roots.retain(|root| root != workspace_root);
        }
        let mut targets = vec![workspace_root.to_path_buf()];
        targets.extend(config_dirs(workspace_root));
        let mut guard = lock(watcher);
        for target in targets {
            // Unwatching a path that was never watched is not an error
            // worth surfacing.
            if let Err(err) = guard.unwatch(&target) {
                debug!("failed to unwatch {}: {err}", target.display());
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Directories (other than the root itself) holding canonical config
/// files under `root`.
fn config_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for candidate in WATCHED_CONFIG_FILES {
        let Some(parent) = root.join(candidate).parent().map(Path::to_path_buf) else {
            continue;
        };
        if parent != root && !dirs.contains(&parent) {
            dirs.push(parent);
        }
    }
    dirs
}

/// Group an event's paths by the workspace root whose canonical config
/// set they belong to. Paths that are not config files (or fall under no
/// registered root) are dropped.
fn changed_roots(roots: &[PathBuf], event_paths: &[PathBuf]) -> Vec<(PathBuf, Vec<PathBuf>)> {
    let mut grouped: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();
    for path in event_paths {
        let Some(root) = roots.iter().find(|root| is_config_path(root, path)) else {
            continue;
        };
        match grouped.iter_mut().find(|(owner, _)| owner == root) {
            Some((_, paths)) => {
                if !paths.contains(path) {
                    paths.push(path.clone());
                }
            }
            None => grouped.push((root.clone(), vec![path.clone()])),
        }
    }
    grouped
}

/// Whether `path` is one of the canonical config files under `root`, or
/// a config directory whose creation/removal changes detection results.
fn is_config_path(root: &Path, path: &Path) -> bool {
    WATCHED_CONFIG_FILES
        .iter()
        .any(|candidate| path == root.join(candidate))
        || is_config_dir(root, path)
}

/// Whether `path` is a config-holding directory under `root`.
fn is_config_dir(root: &Path, path: &Path) -> bool {
    config_dirs(root).iter().any(|dir| dir == path)
}

fn spawn_event_loop(
    mut raw_rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    tx: broadcast::Sender<ConfigChangeEvent>,
    cache: Arc<ResolverCache>,
    roots: Arc<Mutex<Vec<PathBuf>>>,
    watcher: Weak<Mutex<notify::RecommendedWatcher>>,
) {
    let Ok(handle) = Handle::try_current() else {
        warn!("config watcher loop skipped: no Tokio runtime available");
        return;
    };
    handle.spawn(async move {
        while let Some(res) = raw_rx.recv().await {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!("config watcher error: {err}");
                    continue;
                }
            };
            let snapshot = lock(&roots).clone();
            for (workspace_root, changed_paths) in changed_roots(&snapshot, &event.paths) {
                watch_new_config_dirs(&watcher, &workspace_root, &changed_paths).await;
                debug!(
                    workspace = %workspace_root.display(),
                    changed = ?changed_paths,
                    "config change detected"
                );
                cache.invalidate(
                    CacheLevel::Workspace,
                    Some(&workspace_key(&workspace_root)),
                );
                let _ = tx.send(ConfigChangeEvent {
                    workspace_root,
                    changed_paths,
                });
            }
        }
    });
}

/// Start watching config directories that appeared after registration, so
/// files written into them keep producing events.
async fn watch_new_config_dirs(
    watcher: &Weak<Mutex<notify::RecommendedWatcher>>,
    workspace_root: &Path,
    changed_paths: &[PathBuf],
) {
    for path in changed_paths {
        if !is_config_dir(workspace_root, path) {
            continue;
        }
        let is_dir = tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }
        let Some(watcher) = watcher.upgrade() else {
            return;
        };
        if let Err(err) = lock(&watcher).watch(path, RecursiveMode::NonRecursive) {
            warn!("failed to watch {}: {err}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::aggregator::AiIgnoreConfig;

    #[test]
    fn classifies_only_canonical_config_paths() {
        let root = PathBuf::from("/ws");
        let roots = vec![root.clone()];

        let grouped = changed_roots(
            &roots,
            &[
                root.join(".aiexclude"),
                root.join(".pathveil/settings.json"),
                root.join("src/main.rs"),
                PathBuf::from("/elsewhere/.aiexclude"),
            ],
        );
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].0, root);
        assert_eq!(
            grouped[0].1,
            vec![root.join(".aiexclude"), root.join(".pathveil/settings.json")]
        );
    }

    #[test]
    fn config_directory_events_count_as_changes() {
        let root = PathBuf::from("/ws");
        let grouped = changed_roots(&[root.clone()], &[root.join(".claude")]);
        assert_eq!(grouped.len(), 1);
        assert!(is_config_dir(&root, &root.join(".claude")));
        assert!(is_config_dir(&root, &root.join(".pathveil")));
        assert!(!is_config_dir(&root, &root.join("src")));
    }

    #[test]
    fn groups_paths_by_owning_root() {
        let a = PathBuf::from("/a");
        let b = PathBuf::from("/b");
        let grouped = changed_roots(
            &[a.clone(), b.clone()],
            &[a.join(".aiexclude"), b.join(".claude/settings.json")],
        );
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, a);
        assert_eq!(grouped[1].0, b);
    }

    #[tokio::test]
    async fn synthetic_event_invalidates_workspace_and_broadcasts() {
        let root = PathBuf::from("/ws");
        let cache = Arc::new(ResolverCache::default());
        cache.set_workspace(
            workspace_key(&root),
            AiIgnoreConfig::invalid(&root, "seed"),
            None,
        );

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = broadcast::channel(8);
        let roots = Arc::new(Mutex::new(vec![root.clone()]));
        spawn_event_loop(raw_rx, tx, cache.clone(), roots, Weak::new());

        let event = notify::Event::new(notify::EventKind::Modify(
            notify::event::ModifyKind::Any,
        ))
        .add_path(root.join(".aiexclude"));
        raw_tx.send(Ok(event)).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.workspace_root, root);
        assert_eq!(received.changed_paths, vec![root.join(".aiexclude")]);
        assert!(cache.get_workspace(&workspace_key(&root)).is_none());
    }

    async fn wait_for_change(
        rx: &mut broadcast::Receiver<ConfigChangeEvent>,
        expected: &Path,
    ) {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let event = rx.recv().await.unwrap();
                if event.changed_paths.iter().any(|path| path == expected) {
                    return;
                }
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn config_file_in_late_created_directory_invalidates() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(ResolverCache::default());
        let watcher = ConfigWatcher::new(cache.clone()).unwrap();
        watcher.watch_workspace(dir.path());
        let mut rx = watcher.subscribe();

        // The directory does not exist at registration time.
        let claude_dir = dir.path().join(".claude");
        std::fs::create_dir(&claude_dir).unwrap();
        wait_for_change(&mut rx, &claude_dir).await;

        let key = workspace_key(dir.path());
        cache.set_workspace(
            key.clone(),
            AiIgnoreConfig::invalid(dir.path(), "seed"),
            None,
        );

        let settings = claude_dir.join("settings.json");
        std::fs::write(&settings, "{}").unwrap();
        wait_for_change(&mut rx, &settings).await;

        assert!(cache.get_workspace(&key).is_none());
    }

    #[tokio::test]
    async fn noop_watcher_is_inert() {
        let watcher = ConfigWatcher::noop();
        watcher.watch_workspace(Path::new("/ws"));
        watcher.unwatch_workspace(Path::new("/ws"));
        let mut rx = watcher.subscribe();
        assert!(rx.try_recv().is_err());
    }
}
