//! Aggregation of AI-ignore patterns from workspace settings and agent
//! configs into one deduplicated, provenance-tagged configuration.

use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::agent_config::AgentConfigDetector;
use crate::agent_config::AiIgnoreSource;
use crate::pattern::normalize_path;
use crate::pattern::validate_pattern;
use crate::settings;
use crate::sources::AiSourceKind;

/// The aggregated, deduplicated AI-ignore configuration for one workspace.
///
/// Immutable once built: a rebuild supersedes it rather than mutating it.
#[derive(Debug, Clone)]
pub struct AiIgnoreConfig {
    pub workspace_root: PathBuf,
    /// Deduplicated pattern list, insertion order = source precedence order.
    pub patterns: Vec<String>,
    /// Provenance records in aggregation order.
    pub sources: Vec<AiIgnoreSource>,
    pub last_updated: SystemTime,
    pub is_valid: bool,
    pub validation_errors: Vec<String>,
}

impl AiIgnoreConfig {
    /// A deliberately empty, invalid config carrying one error message.
    /// Returned when aggregation itself fails.
    pub fn invalid(workspace_root: &Path, error: impl Into<String>) -> Self {
        Self {
            workspace_root: workspace_root.to_path_buf(),
            patterns: Vec::new(),
            sources: Vec::new(),
            last_updated: SystemTime::now(),
            is_valid: false,
            validation_errors: vec![error.into()],
        }
    }
}

/// Merge workspace-settings patterns and all detected agent configs.
///
/// Settings and agent detection run concurrently. Every candidate pattern
/// passes through the validator; invalid ones land in the validation-error
/// list tagged with the offending pattern instead of being dropped
/// silently. A source is retained when it contributed at least one valid
/// pattern or recorded an error, so error visibility survives even a
/// source with zero usable patterns. The merged list is deduplicated by
/// normalized-path equality, first occurrence winning.
///
/// Per-source read and parse failures never fail aggregation; the only
/// error here is a workspace root that is not a readable directory.
pub async fn aggregate(workspace_root: &Path) -> crate::error::Result<AiIgnoreConfig> {
    // Surfaces a nonexistent or unreadable root as the one hard failure.
    tokio::fs::read_dir(workspace_root).await?;

    let detector = AgentConfigDetector::default();
    let (settings_patterns, agent_sources) = tokio::join!(
        settings::ai_ignore_patterns(workspace_root),
        detector.detect_all(workspace_root)
    );

    let mut validation_errors = Vec::new();
    let mut sources: Vec<AiIgnoreSource> = Vec::new();

    let mut workspace_source = AiIgnoreSource {
        kind: AiSourceKind::WorkspaceSettings,
        patterns: Vec::new(),
        file_path: Some(settings::settings_path(workspace_root)),
        errors: Vec::new(),
    };
    validate_into(
        &settings_patterns,
        &mut workspace_source.patterns,
        &mut validation_errors,
    );
    if !workspace_source.patterns.is_empty() {
        sources.push(workspace_source);
    }

    for agent_source in agent_sources {
        let mut valid_patterns = Vec::new();
        validate_into(
            &agent_source.patterns,
            &mut valid_patterns,
            &mut validation_errors,
        );
        if !valid_patterns.is_empty() || !agent_source.errors.is_empty() {
            sources.push(AiIgnoreSource {
                patterns: valid_patterns,
                ..agent_source
            });
        }
    }

    let mut deduped = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for source in &sources {
        for pattern in &source.patterns {
            if seen.insert(normalize_path(pattern)) {
                deduped.push(pattern.clone());
            }
        }
    }

    Ok(AiIgnoreConfig {
        workspace_root: workspace_root.to_path_buf(),
        patterns: deduped,
        sources,
        last_updated: SystemTime::now(),
        is_valid: validation_errors.is_empty(),
        validation_errors,
    })
}

fn validate_into(candidates: &[String], valid: &mut Vec<String>, errors: &mut Vec<String>) {
    for candidate in candidates {
        let validation = validate_pattern(candidate);
        if validation.valid {
            valid.push(validation.pattern);
        } else {
            for error in &validation.errors {
                errors.push(format!("{}: {error}", validation.pattern));
            }
        }
    }
}
