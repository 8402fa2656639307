//! Exclusion source identities and their precedence ordering.
//!
//! Two parallel closed sets exist: [`Source`] identifies the general tool
//! exclusion mechanisms consulted by the state resolver, and
//! [`AiSourceKind`] identifies the providers feeding AI-ignore aggregation.
//! Precedence is an explicit rank function rather than declaration order so
//! it stays queryable and testable independently of iteration order.

use serde::Deserialize;
use serde::Serialize;

/// A concrete exclusion mechanism consulted during state resolution.
///
/// Config-based sources outrank ignore-file sources, which outrank
/// workspace-settings sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    ConfigTsconfig,
    ConfigEslint,
    ConfigPrettier,
    IgnoreFileGit,
    IgnoreFileDocker,
    IgnoreFileEslint,
    IgnoreFilePrettier,
    IgnoreFileNpm,
    IgnoreFileStylelint,
    IgnoreFileVscode,
    WorkspaceSettings,
}

impl Source {
    /// Total precedence rank. Lower rank wins when several sources match
    /// the same path.
    pub fn rank(self) -> u8 {
        match self {
            Source::ConfigTsconfig => 0,
            Source::ConfigEslint => 1,
            Source::ConfigPrettier => 2,
            Source::IgnoreFileGit => 10,
            Source::IgnoreFileDocker => 11,
            Source::IgnoreFileEslint => 12,
            Source::IgnoreFilePrettier => 13,
            Source::IgnoreFileNpm => 14,
            Source::IgnoreFileStylelint => 15,
            Source::IgnoreFileVscode => 16,
            Source::WorkspaceSettings => 20,
        }
    }

    /// Whether this source derives from a structured tool config file.
    pub fn is_config_based(self) -> bool {
        self.rank() < 10
    }

    /// Human-readable label used in diagnostics and CLI output.
    pub fn label(self) -> &'static str {
        match self {
            Source::ConfigTsconfig => "tsconfig.json exclude",
            Source::ConfigEslint => "eslint config ignorePatterns",
            Source::ConfigPrettier => "prettier config excludedFiles",
            Source::IgnoreFileGit => ".gitignore",
            Source::IgnoreFileDocker => ".dockerignore",
            Source::IgnoreFileEslint => ".eslintignore",
            Source::IgnoreFilePrettier => ".prettierignore",
            Source::IgnoreFileNpm => ".npmignore",
            Source::IgnoreFileStylelint => ".stylelintignore",
            Source::IgnoreFileVscode => ".vscodeignore",
            Source::WorkspaceSettings => "workspace settings",
        }
    }
}

/// A provider feeding AI-ignore aggregation.
///
/// Aggregation order follows [`AiSourceKind::rank`]: workspace settings
/// first, then agent configs in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AiSourceKind {
    WorkspaceSettings,
    Claude,
    Gemini,
    Custom,
}

impl AiSourceKind {
    /// Aggregation-order rank; lower contributes earlier.
    pub fn rank(self) -> u8 {
        match self {
            AiSourceKind::WorkspaceSettings => 0,
            AiSourceKind::Claude => 1,
            AiSourceKind::Gemini => 2,
            AiSourceKind::Custom => 3,
        }
    }

    /// Short agent name used in detection summaries.
    pub fn agent_name(self) -> &'static str {
        match self {
            AiSourceKind::WorkspaceSettings => "workspace",
            AiSourceKind::Claude => "claude",
            AiSourceKind::Gemini => "gemini",
            AiSourceKind::Custom => "custom",
        }
    }
}
