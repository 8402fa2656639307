//! Detection of third-party AI-agent configuration files.
//!
//! Each supported agent exposes its deny rules in its own shape; a provider
//! normalizes that shape into a common [`AiIgnoreSource`]. Adding an agent
//! means adding one [`AgentConfigProvider`] implementation, nothing else.

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;

use crate::pattern::normalize_path;
use crate::sources::AiSourceKind;

/// Canonical patterns contributed by one provider, with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiIgnoreSource {
    pub kind: AiSourceKind,
    pub patterns: Vec<String>,
    pub file_path: Option<PathBuf>,
    /// Parse failures are non-fatal; partial results carry them here.
    pub errors: Vec<String>,
}

/// Capability interface for one agent's configuration shape.
///
/// `detect` returns `None` when the provider's file does not exist;
/// otherwise it returns whatever patterns could be extracted, with any
/// parse errors recorded rather than propagated.
#[async_trait]
pub trait AgentConfigProvider: Send + Sync {
    fn kind(&self) -> AiSourceKind;

    /// Location of this provider's config file under a workspace root.
    fn config_path(&self, workspace_root: &Path) -> PathBuf;

    async fn detect(&self, workspace_root: &Path) -> Option<AiIgnoreSource>;
}

/// Provider for a JSON settings file carrying `permissions.deny` entries of
/// the textual shape `Read(<path-expression>)`.
pub struct ClaudeSettingsProvider;

#[async_trait]
impl AgentConfigProvider for ClaudeSettingsProvider {
    fn kind(&self) -> AiSourceKind {
        AiSourceKind::Claude
    }

    fn config_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(".claude").join("settings.json")
    }

    async fn detect(&self, workspace_root: &Path) -> Option<AiIgnoreSource> {
        let config_path = self.config_path(workspace_root);
        let mut patterns = Vec::new();
        let mut errors = Vec::new();
        match read_json(&config_path).await {
            Ok(None) => return None,
            Ok(Some(parsed)) => {
                let deny = parsed
                    .pointer("/permissions/deny")
                    .and_then(serde_json::Value::as_array);
                if let Some(entries) = deny {
                    for entry in entries {
                        let Some(text) = entry.as_str() else {
                            continue;
                        };
                        if let Some(expr) = read_deny_expression(text) {
                            patterns.push(normalize_path(expr));
                        }
                    }
                }
            }
            Err(message) => errors.push(message),
        }

        Some(AiIgnoreSource {
            kind: AiSourceKind::Claude,
            patterns,
            file_path: Some(config_path),
            errors,
        })
    }
}

/// Provider for a line-oriented agent exclude file (one pattern per line,
/// `#` comments and blank lines skipped).
pub struct GeminiAiExcludeProvider;

#[async_trait]
impl AgentConfigProvider for GeminiAiExcludeProvider {
    fn kind(&self) -> AiSourceKind {
        AiSourceKind::Gemini
    }

    fn config_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(".aiexclude")
    }

    async fn detect(&self, workspace_root: &Path) -> Option<AiIgnoreSource> {
        let config_path = self.config_path(workspace_root);
        let mut patterns = Vec::new();
        let mut errors = Vec::new();
        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                for line in content.lines() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        continue;
                    }
                    patterns.push(trimmed.to_owned());
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => errors.push(err.to_string()),
        }

        Some(AiIgnoreSource {
            kind: AiSourceKind::Gemini,
            patterns,
            file_path: Some(config_path),
            errors,
        })
    }
}

/// Extract the path expression from a `Read(<expr>)` deny entry. Entries of
/// any other shape are ignored entirely.
fn read_deny_expression(entry: &str) -> Option<&str> {
    entry.strip_prefix("Read(")?.strip_suffix(')')
}

/// Read and parse a JSON file. `Ok(None)` means the file does not exist;
/// read and parse failures come back as message strings.
async fn read_json(path: &Path) -> Result<Option<serde_json::Value>, String> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.to_string()),
    };
    serde_json::from_str(&content).map(Some).map_err(|err| err.to_string())
}

/// File format of a detected agent config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentConfigFormat {
    Json,
    GitignoreStyle,
}

/// Whether a detection parsed cleanly or recorded errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseStatus {
    Success,
    Partial,
}

/// One detected agent config, enriched for diagnostics.
#[derive(Debug, Clone)]
pub struct DetectedAgentConfig {
    pub agent_name: &'static str,
    pub config_path: PathBuf,
    pub patterns: Vec<String>,
    pub format: AgentConfigFormat,
    pub parse_status: ParseStatus,
    pub last_modified: Option<SystemTime>,
}

/// A parse failure attributed to one config file.
#[derive(Debug, Clone)]
pub struct AgentConfigError {
    pub config_path: PathBuf,
    pub message: String,
}

/// Aggregate result of [`AgentConfigDetector::detect_with_summary`].
#[derive(Debug, Clone)]
pub struct DetectionSummary {
    pub workspace_root: PathBuf,
    pub detected: Vec<DetectedAgentConfig>,
    pub total_patterns: usize,
    pub parse_errors: Vec<AgentConfigError>,
}

/// Runs every registered provider against a workspace root.
pub struct AgentConfigDetector {
    providers: Vec<Arc<dyn AgentConfigProvider>>,
}

impl Default for AgentConfigDetector {
    fn default() -> Self {
        Self {
            providers: vec![
                Arc::new(ClaudeSettingsProvider),
                Arc::new(GeminiAiExcludeProvider),
            ],
        }
    }
}

impl AgentConfigDetector {
    pub fn new(providers: Vec<Arc<dyn AgentConfigProvider>>) -> Self {
        Self { providers }
    }

    /// Run all providers concurrently. Results keep provider registration
    /// order regardless of completion order; absent configs are dropped.
    pub async fn detect_all(&self, workspace_root: &Path) -> Vec<AiIgnoreSource> {
        let detections = self
            .providers
            .iter()
            .map(|provider| provider.detect(workspace_root));
        join_all(detections).await.into_iter().flatten().collect()
    }

    /// Like [`Self::detect_all`], additionally resolving file modification
    /// times and classifying each detection as success or partial.
    pub async fn detect_with_summary(&self, workspace_root: &Path) -> DetectionSummary {
        let sources = self.detect_all(workspace_root).await;
        let mut detected = Vec::new();
        let mut parse_errors = Vec::new();
        let mut total_patterns = 0;

        for source in sources {
            total_patterns += source.patterns.len();
            let config_path = source.file_path.clone().unwrap_or_default();
            let last_modified = match tokio::fs::metadata(&config_path).await {
                Ok(meta) => meta.modified().ok(),
                Err(_) => None,
            };

            detected.push(DetectedAgentConfig {
                agent_name: source.kind.agent_name(),
                config_path: config_path.clone(),
                patterns: source.patterns.clone(),
                format: match source.kind {
                    AiSourceKind::Gemini => AgentConfigFormat::GitignoreStyle,
                    _ => AgentConfigFormat::Json,
                },
                parse_status: if source.errors.is_empty() {
                    ParseStatus::Success
                } else {
                    ParseStatus::Partial
                },
                last_modified,
            });

            for message in source.errors {
                parse_errors.push(AgentConfigError {
                    config_path: config_path.clone(),
                    message,
                });
            }
        }

        DetectionSummary {
            workspace_root: workspace_root.to_path_buf(),
            detected,
            total_patterns,
            parse_errors,
        }
    }
}
