//! Line-oriented ignore files (`.gitignore` and friends).
//!
//! One loader and one membership predicate shared by every supported
//! ignore file; the table maps each file name to its exclusion source.

use std::path::Path;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::config_targets::is_file;
use crate::error::Result;
use crate::pattern::matches_any;
use crate::sources::Source;

/// Supported ignore files in precedence order.
pub const IGNORE_FILES: &[(Source, &str)] = &[
    (Source::IgnoreFileGit, ".gitignore"),
    (Source::IgnoreFileDocker, ".dockerignore"),
    (Source::IgnoreFileEslint, ".eslintignore"),
    (Source::IgnoreFilePrettier, ".prettierignore"),
    (Source::IgnoreFileNpm, ".npmignore"),
    (Source::IgnoreFileStylelint, ".stylelintignore"),
    (Source::IgnoreFileVscode, ".vscodeignore"),
];

/// File name for an ignore-file source, if it is one.
pub fn file_name_for(source: Source) -> Option<&'static str> {
    IGNORE_FILES
        .iter()
        .find(|(candidate, _)| *candidate == source)
        .map(|(_, name)| *name)
}

/// Ignore files that exist under `workspace_root`, in precedence order.
pub async fn detect_ignore_files(workspace_root: &Path) -> Vec<(Source, PathBuf)> {
    let mut found = Vec::new();
    for (source, name) in IGNORE_FILES {
        let path = workspace_root.join(name);
        if is_file(&path).await {
            found.push((*source, path));
        }
    }
    found
}

/// Load an ignore file's patterns. Comments and blank lines are skipped;
/// a missing or unreadable file contributes nothing.
pub async fn load_ignore_patterns(path: &Path) -> Vec<String> {
    let Ok(content) = tokio::fs::read_to_string(path).await else {
        return Vec::new();
    };
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Whether `relative_path` matches any pattern in the ignore file at
/// `path`, honoring `!` negation with last-match-wins.
pub async fn ignore_file_excludes(path: &Path, relative_path: &str) -> bool {
    let patterns = load_ignore_patterns(path).await;
    matches_any(relative_path, &patterns)
}

/// Append entries to an ignore file, creating it when absent. Entries
/// already present (by exact line) are skipped.
pub async fn append_ignore_entries<S: AsRef<str>>(path: &Path, entries: &[S]) -> Result<()> {
    let existing = load_ignore_patterns(path).await;
    let fresh: Vec<&str> = entries
        .iter()
        .map(AsRef::as_ref)
        .filter(|entry| !existing.iter().any(|line| line == entry))
        .collect();
    if fresh.is_empty() {
        return Ok(());
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    let needs_newline = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => {
            let content = tokio::fs::read_to_string(path).await?;
            !content.ends_with('\n')
        }
        _ => false,
    };
    let mut block = String::new();
    if needs_newline {
        block.push('\n');
    }
    for entry in fresh {
        block.push_str(entry);
        block.push('\n');
    }
    file.write_all(block.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Remove entries from an ignore file by exact line match. Comments and
/// unrelated lines are preserved.
pub async fn remove_ignore_entries<S: AsRef<str>>(path: &Path, entries: &[S]) -> Result<()> {
    let Ok(content) = tokio::fs::read_to_string(path).await else {
        return Ok(());
    };
    let kept: Vec<&str> = content
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !entries.iter().any(|entry| entry.as_ref() == trimmed)
        })
        .collect();
    let mut rewritten = kept.join("\n");
    if !rewritten.is_empty() {
        rewritten.push('\n');
    }
    tokio::fs::write(path, rewritten).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn detects_only_present_files_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".prettierignore"), "dist\n").unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target\n").unwrap();

        let found = detect_ignore_files(dir.path()).await;
        let sources: Vec<Source> = found.iter().map(|(source, _)| *source).collect();
        assert_eq!(
            sources,
            vec![Source::IgnoreFileGit, Source::IgnoreFilePrettier]
        );
    }

    #[tokio::test]
    async fn loader_skips_comments_and_blanks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".gitignore");
        std::fs::write(&path, "# build output\n\ntarget/**\n  *.log  \n").unwrap();

        let patterns = load_ignore_patterns(&path).await;
        assert_eq!(patterns, vec!["target/**".to_owned(), "*.log".to_owned()]);
    }

    #[tokio::test]
    async fn excludes_honors_negation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".eslintignore");
        std::fs::write(&path, "dist/**\n!dist/keep.js\n").unwrap();

        assert!(ignore_file_excludes(&path, "dist/app.js").await);
        assert!(!ignore_file_excludes(&path, "dist/keep.js").await);
        assert!(!ignore_file_excludes(&path, "src/app.js").await);
    }

    #[tokio::test]
    async fn append_creates_file_and_skips_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".npmignore");

        append_ignore_entries(&path, &["dist", "*.tgz"]).await.unwrap();
        append_ignore_entries(&path, &["dist", "coverage"])
            .await
            .unwrap();

        let patterns = load_ignore_patterns(&path).await;
        assert_eq!(
            patterns,
            vec!["dist".to_owned(), "*.tgz".to_owned(), "coverage".to_owned()]
        );
    }

    #[tokio::test]
    async fn append_inserts_newline_when_file_lacks_one() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".gitignore");
        std::fs::write(&path, "target").unwrap();

        append_ignore_entries(&path, &["dist"]).await.unwrap();
        let patterns = load_ignore_patterns(&path).await;
        assert_eq!(patterns, vec!["target".to_owned(), "dist".to_owned()]);
    }

    #[tokio::test]
    async fn remove_preserves_comments_and_other_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".gitignore");
        std::fs::write(&path, "# keep me\ntarget\ndist\n").unwrap();

        remove_ignore_entries(&path, &["dist"]).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# keep me\ntarget\n");
    }
}
