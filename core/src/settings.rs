//! Workspace settings: AI-ignore pattern source and schema validation.
//!
//! Settings live in `.pathveil/settings.json` under a workspace root. The
//! reader extracts only valid `aiIgnore` patterns; the schema validator
//! reports unknown keys and wrong value shapes without failing the caller.

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use tracing::warn;

use crate::pattern::validate_pattern;

pub const SETTINGS_DIR: &str = ".pathveil";
pub const SETTINGS_FILE: &str = "settings.json";

/// Setting key holding the AI-ignore pattern array.
pub const AI_IGNORE_KEY: &str = "aiIgnore";

const ALLOWED_KEYS: &[&str] = &[
    AI_IGNORE_KEY,
    "defaultIgnoreFile",
    "confirmMixedState",
    "checkDuplicates",
];

/// Location of the settings file under a workspace root.
pub fn settings_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(SETTINGS_DIR).join(SETTINGS_FILE)
}

/// Read the valid AI-ignore patterns from workspace settings.
///
/// Missing file, unreadable file, broken JSON, and a non-array `aiIgnore`
/// all yield an empty list; invalid individual patterns are logged and
/// skipped (the schema validator owns surfacing them as errors).
pub async fn ai_ignore_patterns(workspace_root: &Path) -> Vec<String> {
    let path = settings_path(workspace_root);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read workspace settings");
            return Vec::new();
        }
    };

    let parsed: Value = match serde_json::from_str(&content) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to parse workspace settings JSON");
            return Vec::new();
        }
    };

    let Some(raw) = parsed.get(AI_IGNORE_KEY).and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut patterns = Vec::new();
    for entry in raw {
        let Some(text) = entry.as_str() else {
            warn!(?entry, "AI ignore pattern is not a string");
            continue;
        };
        let validation = validate_pattern(text);
        if validation.valid {
            patterns.push(validation.pattern);
        } else {
            warn!(
                pattern = %validation.pattern,
                errors = ?validation.errors,
                "invalid AI ignore pattern"
            );
        }
    }
    patterns
}

/// Result of validating the settings file against the expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SchemaValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Validate the settings file's schema. A missing file is valid.
pub async fn validate_settings_schema(workspace_root: &Path) -> SchemaValidation {
    let path = settings_path(workspace_root);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return SchemaValidation::ok(),
        Err(err) => {
            return SchemaValidation {
                valid: false,
                errors: vec![parse_settings_error(&path, &err.to_string())],
                warnings: Vec::new(),
            };
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(parsed) => validate_settings_object(&parsed, &path),
        Err(err) => SchemaValidation {
            valid: false,
            errors: vec![parse_settings_error(&path, &err.to_string())],
            warnings: Vec::new(),
        },
    }
}

/// Validate an already-parsed settings value.
pub fn validate_settings_object(parsed: &Value, path: &Path) -> SchemaValidation {
    let Some(object) = parsed.as_object() else {
        return SchemaValidation {
            valid: false,
            errors: vec![parse_settings_error(path, "Expected an object")],
            warnings: Vec::new(),
        };
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for key in object.keys() {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            errors.push(format!("Unknown pathveil setting: {key}"));
        }
    }

    match object.get(AI_IGNORE_KEY) {
        Some(Value::Array(entries)) => {
            for entry in entries {
                match entry.as_str() {
                    Some(text) if text.trim().is_empty() => {
                        errors.push(invalid_pattern_error("<empty>", "Pattern must not be empty"));
                    }
                    Some(_) => {}
                    None => {
                        errors.push(invalid_pattern_error(
                            &entry.to_string(),
                            "Pattern must be a string",
                        ));
                    }
                }
            }
        }
        Some(_) => errors.push(format!("{AI_IGNORE_KEY} must be an array of strings")),
        None => warnings.push("No AI ignore configuration detected".to_owned()),
    }

    SchemaValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

pub(crate) fn invalid_pattern_error(pattern: &str, reason: &str) -> String {
    format!("Invalid AI ignore pattern: {pattern} - {reason}")
}

fn parse_settings_error(path: &Path, error: &str) -> String {
    format!("Failed to parse settings: {} - {error}", path.display())
}
