//! Pathveil CLI - query and edit exclusion state from the command line.

use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde_json::json;

use pathveil_core::AiIgnoreResolver;
use pathveil_core::ConfigWatcher;
use pathveil_core::Source;
use pathveil_core::StateResolver;
use pathveil_core::WorkspaceSet;
use pathveil_core::config_targets;
use pathveil_core::ignore_files;
use pathveil_core::settings;
use pathveil_core::workspace::relative_to;

#[derive(Parser)]
#[command(name = "pathveil")]
#[command(about = "Resolve which tool configs and ignore files exclude a path")]
struct Cli {
    /// Workspace root to resolve against
    #[arg(short = 'C', long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show AI-ignore status for a path
    Status {
        /// Path to evaluate
        path: PathBuf,
    },

    /// Show the effective exclusion state for one or more paths
    State {
        /// Paths to evaluate (two or more are aggregated)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show the aggregated AI-ignore configuration
    Config,

    /// List detected AI-agent configuration files
    Detect,

    /// Watch config files and report changes until interrupted
    Watch,

    /// Add paths to an exclusion target
    Exclude {
        /// Paths to exclude
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Where to record the exclusion
        #[arg(short, long, value_enum, default_value_t = Target::Gitignore)]
        target: Target,
    },

    /// Remove paths from an exclusion target
    Include {
        /// Paths to include again
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Where to remove the exclusion from
        #[arg(short, long, value_enum, default_value_t = Target::Gitignore)]
        target: Target,
    },
}

/// A file that can carry exclusion entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Tsconfig,
    Eslint,
    Prettier,
    Gitignore,
    Dockerignore,
    Eslintignore,
    Prettierignore,
    Npmignore,
    Stylelintignore,
    Vscodeignore,
    /// The aiIgnore list in workspace settings
    Settings,
}

impl Target {
    fn ignore_file_source(self) -> Option<Source> {
        match self {
            Target::Gitignore => Some(Source::IgnoreFileGit),
            Target::Dockerignore => Some(Source::IgnoreFileDocker),
            Target::Eslintignore => Some(Source::IgnoreFileEslint),
            Target::Prettierignore => Some(Source::IgnoreFilePrettier),
            Target::Npmignore => Some(Source::IgnoreFileNpm),
            Target::Stylelintignore => Some(Source::IgnoreFileStylelint),
            Target::Vscodeignore => Some(Source::IgnoreFileVscode),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pathveil_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let workspace = cli.workspace.canonicalize().unwrap_or(cli.workspace.clone());
    let workspaces = WorkspaceSet::single(&workspace);

    match cli.command {
        Command::Status { path } => status(&workspaces, &absolute(&path), cli.json).await,
        Command::State { paths } => {
            let paths: Vec<PathBuf> = paths.iter().map(|p| absolute(p)).collect();
            state(&workspaces, &paths, cli.json).await
        }
        Command::Config => config(&workspaces, &workspace, cli.json).await,
        Command::Detect => detect(&workspace, cli.json).await,
        Command::Watch => watch(&workspaces, &workspace).await,
        Command::Exclude { paths, target } => {
            let paths: Vec<PathBuf> = paths.iter().map(|p| absolute(p)).collect();
            edit_target(&workspace, &paths, target, true).await
        }
        Command::Include { paths, target } => {
            let paths: Vec<PathBuf> = paths.iter().map(|p| absolute(p)).collect();
            edit_target(&workspace, &paths, target, false).await
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

async fn status(workspaces: &WorkspaceSet, path: &Path, as_json: bool) -> anyhow::Result<()> {
    let resolver = AiIgnoreResolver::new(workspaces.clone());
    let status = resolver.status(path).await;

    if as_json {
        let output = json!({
            "path": status.path,
            "isIgnored": status.is_ignored,
            "matchedPatterns": status.matched_patterns,
            "source": status.source.map(|s| s.agent_name()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if status.is_ignored {
        let source = status
            .source
            .map(|s| s.agent_name().to_owned())
            .unwrap_or_else(|| "unknown".to_owned());
        println!("{}: ignored for AI (source: {source})", path.display());
        for pattern in &status.matched_patterns {
            println!("  matched: {pattern}");
        }
    } else {
        println!("{}: visible to AI", path.display());
    }
    Ok(())
}

async fn state(workspaces: &WorkspaceSet, paths: &[PathBuf], as_json: bool) -> anyhow::Result<()> {
    let resolver = StateResolver::with_default_sources(workspaces.clone());
    let state = resolver.resolve_states(paths).await;

    if as_json {
        let output = json!({
            "excluded": state.excluded,
            "mixed": state.mixed,
            "source": state.source,
            "sourcesApplied": state.sources_applied,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if state.mixed {
        let verdict = if state.excluded { "mostly excluded" } else { "mostly included" };
        println!("mixed state across {} paths ({verdict})", paths.len());
    } else if state.excluded {
        let source = state
            .source
            .map(Source::label)
            .unwrap_or("unknown");
        println!("excluded by {source}");
        for applied in &state.sources_applied {
            println!("  also matched: {}", applied.label());
        }
    } else {
        println!("not excluded");
    }
    Ok(())
}

async fn config(
    workspaces: &WorkspaceSet,
    workspace: &Path,
    as_json: bool,
) -> anyhow::Result<()> {
    let resolver = AiIgnoreResolver::new(workspaces.clone());
    let config = resolver.parse_config(workspace).await;

    if as_json {
        let sources: Vec<serde_json::Value> = config
            .sources
            .iter()
            .map(|source| {
                json!({
                    "kind": source.kind,
                    "patterns": source.patterns,
                    "filePath": source.file_path,
                    "errors": source.errors,
                })
            })
            .collect();
        let output = json!({
            "workspaceRoot": config.workspace_root,
            "patterns": config.patterns,
            "sources": sources,
            "isValid": config.is_valid,
            "validationErrors": config.validation_errors,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("workspace: {}", config.workspace_root.display());
    println!(
        "{} patterns from {} sources ({})",
        config.patterns.len(),
        config.sources.len(),
        if config.is_valid { "valid" } else { "invalid" }
    );
    for source in &config.sources {
        let origin = source
            .file_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| source.kind.agent_name().to_owned());
        println!("  [{}] {origin}", source.kind.agent_name());
        for pattern in &source.patterns {
            println!("    {pattern}");
        }
        for error in &source.errors {
            println!("    error: {error}");
        }
    }
    for error in &config.validation_errors {
        println!("  validation error: {error}");
    }
    Ok(())
}

async fn detect(workspace: &Path, as_json: bool) -> anyhow::Result<()> {
    let detector = pathveil_core::AgentConfigDetector::default();
    let summary = detector.detect_with_summary(workspace).await;

    if as_json {
        let detected: Vec<serde_json::Value> = summary
            .detected
            .iter()
            .map(|config| {
                json!({
                    "agent": config.agent_name,
                    "configPath": config.config_path,
                    "patterns": config.patterns,
                    "format": config.format,
                    "parseStatus": config.parse_status,
                })
            })
            .collect();
        let output = json!({
            "workspaceRoot": summary.workspace_root,
            "detected": detected,
            "totalPatterns": summary.total_patterns,
            "parseErrors": summary.parse_errors.len(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if summary.detected.is_empty() {
        println!("no agent configs detected");
        return Ok(());
    }
    for config in &summary.detected {
        println!(
            "{}: {} ({} patterns, {:?})",
            config.agent_name,
            config.config_path.display(),
            config.patterns.len(),
            config.parse_status
        );
    }
    for error in &summary.parse_errors {
        println!("error in {}: {}", error.config_path.display(), error.message);
    }
    Ok(())
}

async fn watch(workspaces: &WorkspaceSet, workspace: &Path) -> anyhow::Result<()> {
    let resolver = AiIgnoreResolver::new(workspaces.clone());
    let watcher = ConfigWatcher::new(resolver.cache())?;
    watcher.watch_workspace(workspace);
    let mut rx = watcher.subscribe();

    println!("watching {} (ctrl-c to stop)", workspace.display());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => {
                let Ok(event) = event else {
                    continue;
                };
                for path in &event.changed_paths {
                    println!("changed: {}", path.display());
                }
            }
        }
    }
    Ok(())
}

async fn edit_target(
    workspace: &Path,
    paths: &[PathBuf],
    target: Target,
    add: bool,
) -> anyhow::Result<()> {
    match target {
        Target::Tsconfig => {
            let config = workspace.join(config_targets::TSCONFIG_FILE);
            if add {
                config_targets::add_to_tsconfig_exclude(&config, workspace, paths).await?;
            } else {
                config_targets::remove_from_tsconfig_exclude(&config, workspace, paths).await?;
            }
        }
        Target::Eslint => {
            let config = workspace.join(config_targets::ESLINT_CONFIG_FILE);
            if add {
                config_targets::add_to_eslint_ignore(&config, workspace, paths).await?;
            } else {
                config_targets::remove_from_eslint_ignore(&config, workspace, paths).await?;
            }
        }
        Target::Prettier => {
            let config = prettier_config_path(workspace);
            if add {
                config_targets::add_to_prettier_excluded(&config, workspace, paths).await?;
            } else {
                config_targets::remove_from_prettier_excluded(&config, workspace, paths).await?;
            }
        }
        Target::Settings => {
            edit_settings_patterns(workspace, paths, add).await?;
        }
        _ => {
            let source = target
                .ignore_file_source()
                .ok_or_else(|| anyhow::anyhow!("unsupported target"))?;
            let name = ignore_files::file_name_for(source)
                .ok_or_else(|| anyhow::anyhow!("target has no ignore file"))?;
            let file = workspace.join(name);
            let entries: Vec<String> = paths
                .iter()
                .filter_map(|path| relative_to(workspace, path))
                .collect();
            if add {
                ignore_files::append_ignore_entries(&file, &entries).await?;
            } else {
                ignore_files::remove_ignore_entries(&file, &entries).await?;
            }
        }
    }

    let verb = if add { "excluded" } else { "included" };
    println!("{verb} {} path(s)", paths.len());
    Ok(())
}

fn prettier_config_path(workspace: &Path) -> PathBuf {
    for candidate in config_targets::PRETTIER_CONFIG_FILES {
        let path = workspace.join(candidate);
        if path.is_file() {
            return path;
        }
    }
    workspace.join(".prettierrc")
}

/// Add or remove workspace-relative patterns in the settings aiIgnore list,
/// creating the settings file when adding to a workspace without one.
async fn edit_settings_patterns(
    workspace: &Path,
    paths: &[PathBuf],
    add: bool,
) -> anyhow::Result<()> {
    let path = settings::settings_path(workspace);
    let mut parsed: serde_json::Value = match tokio::fs::read_to_string(&path).await {
        Ok(content) => serde_json::from_str(&content)?,
        Err(_) if add => json!({}),
        Err(_) => return Ok(()),
    };

    let entries: Vec<String> = paths
        .iter()
        .filter_map(|candidate| relative_to(workspace, candidate))
        .collect();
    let object = parsed
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("settings file is not a JSON object"))?;
    let list = object
        .entry(settings::AI_IGNORE_KEY)
        .or_insert_with(|| json!([]));
    let list = list
        .as_array_mut()
        .ok_or_else(|| anyhow::anyhow!("{} is not an array", settings::AI_IGNORE_KEY))?;

    if add {
        for entry in entries {
            let value = serde_json::Value::String(entry);
            if !list.contains(&value) {
                list.push(value);
            }
        }
    } else {
        list.retain(|value| {
            value
                .as_str()
                .is_none_or(|text| !entries.iter().any(|entry| entry == text))
        });
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut content = serde_json::to_string_pretty(&parsed)?;
    content.push('\n');
    tokio::fs::write(&path, content).await?;
    Ok(())
}
