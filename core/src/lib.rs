//! Pathveil core: effective exclusion-state resolution.
//!
//! Answers two questions about any path in a workspace:
//!
//! - **Is it excluded, and by which tool?** The [`StateResolver`] ranks
//!   structured configs (tsconfig, eslint, prettier) above line-oriented
//!   ignore files above workspace settings and reports every source that
//!   applied.
//! - **Is it hidden from AI agents?** The [`AiIgnoreResolver`] aggregates
//!   workspace settings with detected agent configs (Claude, Gemini) into
//!   one validated pattern list, evaluates it with gitignore-style
//!   negation, and attributes matches to their originating source.
//!
//! Results flow through a two-tier TTL cache keyed per workspace and per
//! file; the [`ConfigWatcher`] invalidates a workspace's entries when its
//! config files change on disk.

pub mod agent_config;
pub mod aggregator;
pub mod cache;
pub mod config_targets;
pub mod error;
pub mod ignore_files;
pub mod pattern;
pub mod resolver;
pub mod settings;
pub mod sources;
pub mod state;
pub mod watcher;
pub mod workspace;

pub use agent_config::AgentConfigDetector;
pub use agent_config::AgentConfigProvider;
pub use agent_config::AiIgnoreSource;
pub use agent_config::DetectionSummary;
pub use aggregator::AiIgnoreConfig;
pub use aggregator::aggregate;
pub use cache::AiIgnoreCache;
pub use cache::CacheLevel;
pub use error::PathveilError;
pub use error::Result;
pub use pattern::PatternEvaluation;
pub use pattern::PatternValidation;
pub use pattern::evaluate_patterns;
pub use pattern::normalize_path;
pub use pattern::validate_pattern;
pub use resolver::AiIgnoreResolver;
pub use resolver::AiIgnoreStatus;
pub use resolver::Notifier;
pub use resolver::ResolverCache;
pub use sources::AiSourceKind;
pub use sources::Source;
pub use state::EffectiveState;
pub use state::ExclusionSource;
pub use state::StateResolver;
pub use watcher::ConfigChangeEvent;
pub use watcher::ConfigWatcher;
pub use workspace::WorkspaceSet;
