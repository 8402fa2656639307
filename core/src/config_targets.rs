//! Readers and writers for structured tool-config exclusion lists.
//!
//! Three shapes are supported: tsconfig-style `exclude` arrays,
//! eslint-style `ignorePatterns` arrays, and prettier-style
//! `overrides[].excludedFiles` arrays. Reading powers the config-based
//! state-resolver predicates; writing powers the exclude/include commands.

use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use serde_json::json;

use crate::error::PathveilError;
use crate::error::Result;
use crate::pattern::normalize_path;
use crate::workspace::relative_to;

pub const TSCONFIG_FILE: &str = "tsconfig.json";
pub const ESLINT_CONFIG_FILE: &str = ".eslintrc.json";
pub const PRETTIER_CONFIG_FILES: &[&str] = &[".prettierrc", ".prettierrc.json"];

/// Structured config files found under one workspace root.
#[derive(Debug, Clone, Default)]
pub struct ConfigTargets {
    pub tsconfig: Option<PathBuf>,
    pub eslint: Option<PathBuf>,
    pub prettier: Option<PathBuf>,
}

/// Locate the structured config files present under `workspace_root`.
pub async fn detect_config_targets(workspace_root: &Path) -> ConfigTargets {
    let mut targets = ConfigTargets::default();

    let tsconfig = workspace_root.join(TSCONFIG_FILE);
    if is_file(&tsconfig).await {
        targets.tsconfig = Some(tsconfig);
    }
    let eslint = workspace_root.join(ESLINT_CONFIG_FILE);
    if is_file(&eslint).await {
        targets.eslint = Some(eslint);
    }
    for candidate in PRETTIER_CONFIG_FILES {
        let path = workspace_root.join(candidate);
        if is_file(&path).await {
            targets.prettier = Some(path);
            break;
        }
    }

    targets
}

/// Non-blocking existence check shared by the detection helpers.
pub(crate) async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Exclusion patterns from a tsconfig-style `exclude` array. Missing or
/// unparsable files contribute nothing.
pub async fn tsconfig_exclude_patterns(config_path: &Path) -> Vec<String> {
    string_array(&read_json_or_empty(config_path).await, "/exclude")
}

/// Exclusion patterns from an eslint-style `ignorePatterns` array.
pub async fn eslint_ignore_patterns(config_path: &Path) -> Vec<String> {
    string_array(&read_json_or_empty(config_path).await, "/ignorePatterns")
}

/// Excluded files collected across all prettier-style `overrides` entries.
pub async fn prettier_excluded_files(config_path: &Path) -> Vec<String> {
    let parsed = read_json_or_empty(config_path).await;
    let Some(overrides) = parsed.get("overrides").and_then(Value::as_array) else {
        return Vec::new();
    };
    overrides
        .iter()
        .flat_map(|entry| {
            entry
                .get("excludedFiles")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
        })
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect()
}

/// Whether `relative_path` appears in `patterns` by normalized equality.
pub fn has_entry<S: AsRef<str>>(patterns: &[S], relative_path: &str) -> bool {
    let normalized = normalize_path(relative_path);
    patterns
        .iter()
        .any(|pattern| normalize_path(pattern.as_ref()) == normalized)
}

/// Add entries for `paths` to a tsconfig-style `exclude` array.
/// Directories are written with a `/**/*` suffix so their contents match.
pub async fn add_to_tsconfig_exclude(
    config_path: &Path,
    workspace_root: &Path,
    paths: &[PathBuf],
) -> Result<()> {
    let mut parsed = read_json(config_path).await?;
    let entries = entries_for(workspace_root, paths).await;
    mutate_string_array(&mut parsed, "exclude", |list| {
        for entry in entries {
            if !list.contains(&entry) {
                list.push(entry);
            }
        }
    });
    write_json(config_path, &parsed).await
}

/// Remove entries for `paths` from a tsconfig-style `exclude` array.
pub async fn remove_from_tsconfig_exclude(
    config_path: &Path,
    workspace_root: &Path,
    paths: &[PathBuf],
) -> Result<()> {
    let mut parsed = read_json(config_path).await?;
    let unwanted: Vec<String> = entries_for(workspace_root, paths).await;
    mutate_string_array(&mut parsed, "exclude", |list| {
        list.retain(|entry| !has_entry(&unwanted, entry));
    });
    write_json(config_path, &parsed).await
}

/// Add workspace-relative entries to an eslint-style `ignorePatterns`.
pub async fn add_to_eslint_ignore(
    config_path: &Path,
    workspace_root: &Path,
    paths: &[PathBuf],
) -> Result<()> {
    let mut parsed = read_json(config_path).await?;
    let entries = relative_entries(workspace_root, paths);
    mutate_string_array(&mut parsed, "ignorePatterns", |list| {
        for entry in entries {
            if !list.contains(&entry) {
                list.push(entry);
            }
        }
    });
    write_json(config_path, &parsed).await
}

/// Remove workspace-relative entries from an eslint-style `ignorePatterns`.
pub async fn remove_from_eslint_ignore(
    config_path: &Path,
    workspace_root: &Path,
    paths: &[PathBuf],
) -> Result<()> {
    let mut parsed = read_json(config_path).await?;
    let unwanted = relative_entries(workspace_root, paths);
    mutate_string_array(&mut parsed, "ignorePatterns", |list| {
        list.retain(|entry| !has_entry(&unwanted, entry));
    });
    write_json(config_path, &parsed).await
}

/// Add entries to the catch-all prettier override's `excludedFiles`,
/// creating the override when absent.
pub async fn add_to_prettier_excluded(
    config_path: &Path,
    workspace_root: &Path,
    paths: &[PathBuf],
) -> Result<()> {
    let mut parsed = read_json(config_path).await?;
    let entries = relative_entries(workspace_root, paths);

    let Some(object) = parsed.as_object_mut() else {
        return Err(PathveilError::parse(config_path, "Expected an object"));
    };
    let overrides = object
        .entry("overrides")
        .or_insert_with(|| json!([]));
    let Some(overrides) = overrides.as_array_mut() else {
        return Err(PathveilError::parse(config_path, "overrides must be an array"));
    };

    // A catch-all override has no `files` constraint.
    let position = overrides
        .iter()
        .position(|entry| entry.get("files").is_none());
    let index = match position {
        Some(index) => index,
        None => {
            overrides.push(json!({}));
            overrides.len() - 1
        }
    };
    if let Some(target) = overrides[index].as_object_mut() {
        let excluded = target
            .entry("excludedFiles")
            .or_insert_with(|| json!([]));
        if let Some(list) = excluded.as_array_mut() {
            for entry in entries {
                let value = Value::String(entry);
                if !list.contains(&value) {
                    list.push(value);
                }
            }
        }
    }

    write_json(config_path, &parsed).await
}

/// Remove entries from every prettier override's `excludedFiles`.
pub async fn remove_from_prettier_excluded(
    config_path: &Path,
    workspace_root: &Path,
    paths: &[PathBuf],
) -> Result<()> {
    let mut parsed = read_json(config_path).await?;
    let unwanted = relative_entries(workspace_root, paths);

    if let Some(overrides) = parsed.get_mut("overrides").and_then(Value::as_array_mut) {
        for entry in overrides {
            let Some(list) = entry
                .get_mut("excludedFiles")
                .and_then(Value::as_array_mut)
            else {
                continue;
            };
            list.retain(|value| match value.as_str() {
                Some(text) => !has_entry(&unwanted, text),
                None => true,
            });
        }
    }

    write_json(config_path, &parsed).await
}

/// Workspace-relative entries for `paths`, directories suffixed `/**/*`.
async fn entries_for(workspace_root: &Path, paths: &[PathBuf]) -> Vec<String> {
    let mut entries = Vec::new();
    for path in paths {
        let Some(rel) = relative_to(workspace_root, path) else {
            continue;
        };
        let is_dir = tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        entries.push(if is_dir { format!("{rel}/**/*") } else { rel });
    }
    entries
}

fn relative_entries(workspace_root: &Path, paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|path| relative_to(workspace_root, path))
        .collect()
}

fn string_array(parsed: &Value, pointer: &str) -> Vec<String> {
    parsed
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn mutate_string_array(parsed: &mut Value, key: &str, mutate: impl FnOnce(&mut Vec<String>)) {
    let existing = parsed
        .get(key)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    let mut list: Vec<String> = existing;
    mutate(&mut list);
    if let Some(object) = parsed.as_object_mut() {
        object.insert(key.to_owned(), json!(list));
    }
}

async fn read_json(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|err| PathveilError::parse(path, err.to_string()))
}

async fn read_json_or_empty(path: &Path) -> Value {
    read_json(path).await.unwrap_or(Value::Null)
}

async fn write_json(path: &Path, value: &Value) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)
        .map_err(|err| PathveilError::parse(path, err.to_string()))?;
    content.push('\n');
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, content: &str) {
        std::fs::write(root.join(rel), content).unwrap();
    }

    #[tokio::test]
    async fn detects_present_config_files() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "tsconfig.json", "{}");
        write_file(dir.path(), ".prettierrc", "{}");

        let targets = detect_config_targets(dir.path()).await;
        assert!(targets.tsconfig.is_some());
        assert!(targets.eslint.is_none());
        assert_eq!(targets.prettier, Some(dir.path().join(".prettierrc")));
    }

    #[tokio::test]
    async fn reads_exclude_arrays_defensively() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "tsconfig.json",
            r#"{"exclude": ["dist/**/*", 42, "node_modules"]}"#,
        );

        let patterns = tsconfig_exclude_patterns(&dir.path().join("tsconfig.json")).await;
        assert_eq!(
            patterns,
            vec!["dist/**/*".to_owned(), "node_modules".to_owned()]
        );

        let missing = tsconfig_exclude_patterns(&dir.path().join("absent.json")).await;
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn prettier_excluded_files_span_all_overrides() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            ".prettierrc",
            r#"{"overrides": [
                {"files": "*.md", "excludedFiles": ["docs/gen.md"]},
                {"excludedFiles": ["dist/a.js"]}
            ]}"#,
        );

        let excluded = prettier_excluded_files(&dir.path().join(".prettierrc")).await;
        assert_eq!(excluded, vec!["docs/gen.md".to_owned(), "dist/a.js".to_owned()]);
    }

    #[test]
    fn has_entry_uses_normalized_equality() {
        let patterns = ["./dist/app.js".to_owned()];
        assert!(has_entry(&patterns, "dist/app.js"));
        assert!(has_entry(&patterns, r"dist\app.js"));
        assert!(!has_entry(&patterns, "dist/other.js"));
    }

    #[tokio::test]
    async fn add_and_remove_tsconfig_exclude_round_trip() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "tsconfig.json", r#"{"exclude": ["existing"]}"#);
        std::fs::create_dir(dir.path().join("gen")).unwrap();
        write_file(dir.path(), "a.txt", "");

        let config = dir.path().join("tsconfig.json");
        let items = vec![dir.path().join("gen"), dir.path().join("a.txt")];
        add_to_tsconfig_exclude(&config, dir.path(), &items)
            .await
            .unwrap();

        let patterns = tsconfig_exclude_patterns(&config).await;
        assert_eq!(
            patterns,
            vec![
                "existing".to_owned(),
                "gen/**/*".to_owned(),
                "a.txt".to_owned()
            ]
        );

        remove_from_tsconfig_exclude(&config, dir.path(), &items)
            .await
            .unwrap();
        assert_eq!(
            tsconfig_exclude_patterns(&config).await,
            vec!["existing".to_owned()]
        );
    }

    #[tokio::test]
    async fn add_to_prettier_creates_catch_all_override() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), ".prettierrc", "{}");
        write_file(dir.path(), "gen.js", "");

        let config = dir.path().join(".prettierrc");
        add_to_prettier_excluded(&config, dir.path(), &[dir.path().join("gen.js")])
            .await
            .unwrap();
        assert_eq!(
            prettier_excluded_files(&config).await,
            vec!["gen.js".to_owned()]
        );

        remove_from_prettier_excluded(&config, dir.path(), &[dir.path().join("gen.js")])
            .await
            .unwrap();
        assert!(prettier_excluded_files(&config).await.is_empty());
    }
}
