//! Two-tier time-bounded cache for AI-ignore results.
//!
//! Independent keyspaces: file-level entries keyed
//! `{workspace_key}:{relative_path}` and workspace-level entries keyed
//! `{workspace_key}`. File results are derived from workspace configs, so
//! invalidating a workspace key cascades to the file level sharing that
//! prefix; a file-level entry is never trusted past its owning workspace
//! entry's invalidation.

use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;

pub const DEFAULT_FILE_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_WORKSPACE_TTL: Duration = Duration::from_secs(60);

/// Cache keyspace selector for invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLevel {
    File,
    Workspace,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    expires_at: Instant,
}

/// Two independent TTL maps with cascading workspace→file invalidation.
///
/// Constructor-injected wherever it is used so tests can hold isolated
/// instances per workspace.
#[derive(Debug)]
pub struct AiIgnoreCache<F, W> {
    file_entries: DashMap<String, Entry<F>>,
    workspace_entries: DashMap<String, Entry<W>>,
    file_ttl: Duration,
    workspace_ttl: Duration,
}

impl<F, W> Default for AiIgnoreCache<F, W> {
    fn default() -> Self {
        Self::with_ttls(DEFAULT_FILE_TTL, DEFAULT_WORKSPACE_TTL)
    }
}

impl<F, W> AiIgnoreCache<F, W> {
    pub fn with_ttls(file_ttl: Duration, workspace_ttl: Duration) -> Self {
        Self {
            file_entries: DashMap::new(),
            workspace_entries: DashMap::new(),
            file_ttl,
            workspace_ttl,
        }
    }

    /// Remove entries. With no prefix the whole level is cleared; with a
    /// prefix only keys belonging to it go (the prefix itself, its `:`
    /// file entries, and nested `/` roots). Invalidating the workspace
    /// level always cascades to the file level for the same prefix.
    pub fn invalidate(&self, level: CacheLevel, key_prefix: Option<&str>) {
        match level {
            CacheLevel::File => clear(&self.file_entries, key_prefix),
            CacheLevel::Workspace => {
                clear(&self.workspace_entries, key_prefix);
                clear(&self.file_entries, key_prefix);
            }
        }
    }

    pub fn clear(&self) {
        self.file_entries.clear();
        self.workspace_entries.clear();
    }

    pub fn len(&self, level: CacheLevel) -> usize {
        match level {
            CacheLevel::File => self.file_entries.len(),
            CacheLevel::Workspace => self.workspace_entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_entries.is_empty() && self.workspace_entries.is_empty()
    }
}

impl<F: Clone, W: Clone> AiIgnoreCache<F, W> {
    pub fn get_file(&self, key: &str) -> Option<F> {
        read(&self.file_entries, key)
    }

    pub fn set_file(&self, key: impl Into<String>, value: F, ttl: Option<Duration>) {
        write(
            &self.file_entries,
            key.into(),
            value,
            ttl.unwrap_or(self.file_ttl),
        );
    }

    pub fn get_workspace(&self, key: &str) -> Option<W> {
        read(&self.workspace_entries, key)
    }

    pub fn set_workspace(&self, key: impl Into<String>, value: W, ttl: Option<Duration>) {
        write(
            &self.workspace_entries,
            key.into(),
            value,
            ttl.unwrap_or(self.workspace_ttl),
        );
    }
}

/// Lazy expiry: a read past the entry's expiry deletes it and misses.
fn read<T: Clone>(map: &DashMap<String, Entry<T>>, key: &str) -> Option<T> {
    let now = Instant::now();
    map.remove_if(key, |_, entry| entry.expires_at <= now);
    map.get(key).map(|entry| entry.value.clone())
}

fn write<T>(map: &DashMap<String, Entry<T>>, key: String, value: T, ttl: Duration) {
    map.insert(
        key,
        Entry {
            value,
            expires_at: Instant::now() + ttl,
        },
    );
}

fn clear<T>(map: &DashMap<String, Entry<T>>, key_prefix: Option<&str>) {
    match key_prefix {
        None => map.clear(),
        Some(prefix) => map.retain(|key, _| !key_belongs_to(key, prefix)),
    }
}

/// Boundary-aware prefix ownership: `key` is the prefix itself, one of its
/// file entries (`{prefix}:{rel}`), or an entry under a nested root
/// (`{prefix}/...`). `/ws` does not match `/ws2`.
fn key_belongs_to(key: &str, prefix: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(':') || rest.starts_with('/'),
        None => false,
    }
}
