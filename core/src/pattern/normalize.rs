//! Path normalization for pattern comparison.

/// Normalize a path or pattern for matching and deduplication.
///
/// Backslashes become forward slashes and a leading `./` is stripped, so
/// patterns written on different platforms compare equal.
pub fn normalize_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .map(str::to_owned)
        .unwrap_or(normalized)
}
