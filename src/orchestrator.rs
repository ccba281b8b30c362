//! Build orchestrator.
//!
//! For every command: derive its artifacts, look up its dependencies, decide
//! staleness, then either refresh the existing artifacts' timestamps, report
//! that it would rebuild, or expand the source and run the toolchain.
//!
//! Commands are independent. The default mode runs them on a bounded pool of
//! blocking tokio workers and reports every failure together once all
//! dispatched commands have finished. Sequential mode runs them one at a time
//! in list order and stops at the first failure.

use crate::command::{BuildCommand, OutputArtifactSet, load_command_list};
use crate::config::BuildSettings;
use crate::dep_cache::{CacheKey, DependencyCache};
use crate::error::{BuildError, CommandFailure, Result};
use crate::layout::SourceLayout;
use crate::staleness::{files_out_of_date, touch_existing};
use crate::toolchain::Toolchain;
use shadergen_scribe::{ExpandOptions, SourceUnit, process};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Name of the profile define injected into every expansion.
pub const GL_PROFILE_DEFINE: &str = "GLPROFILE";

/// What happened to one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Expanded and run through the whole toolchain.
    Rebuilt,
    /// Outputs were current; their timestamps were refreshed.
    UpToDate,
    /// Stale, but the run was a dry run.
    WouldRebuild,
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandOutcome::Rebuilt => "rebuilt",
            CommandOutcome::UpToDate => "up to date",
            CommandOutcome::WouldRebuild => "would rebuild",
        })
    }
}

/// One line of a [`BuildReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub command: BuildCommand,
    pub outcome: CommandOutcome,
}

/// Outcomes of a successful run, in command-list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub commands: Vec<CommandReport>,
}

impl BuildReport {
    pub fn count(&self, outcome: CommandOutcome) -> usize {
        self.commands
            .iter()
            .filter(|c| c.outcome == outcome)
            .count()
    }

    pub fn rebuilt(&self) -> usize {
        self.count(CommandOutcome::Rebuilt)
    }

    pub fn up_to_date(&self) -> usize {
        self.count(CommandOutcome::UpToDate)
    }

    pub fn would_rebuild(&self) -> usize {
        self.count(CommandOutcome::WouldRebuild)
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rebuilt, {} up to date, {} would rebuild",
            self.rebuilt(),
            self.up_to_date(),
            self.would_rebuild()
        )
    }
}

/// Everything a worker needs, shared read-only across the pool.
#[derive(Debug)]
pub struct BuildContext {
    pub settings: BuildSettings,
    pub layout: SourceLayout,
    pub toolchain: Toolchain,
    pub cache: DependencyCache,
}

impl BuildContext {
    pub fn new(settings: BuildSettings, cache: DependencyCache) -> Self {
        Self {
            layout: SourceLayout::new(&settings.source_dir),
            toolchain: Toolchain::new(&settings.tools_dir),
            settings,
            cache,
        }
    }
}

/// Runs command lists against one [`BuildContext`].
pub struct BuildOrchestrator {
    context: Arc<BuildContext>,
}

impl BuildOrchestrator {
    /// Create an orchestrator, loading the persisted dependency cache.
    pub fn new(settings: BuildSettings) -> Self {
        let cache = DependencyCache::load(&settings.cache_path);
        Self::with_cache(settings, cache)
    }

    pub fn with_cache(settings: BuildSettings, cache: DependencyCache) -> Self {
        Self {
            context: Arc::new(BuildContext::new(settings, cache)),
        }
    }

    pub fn cache(&self) -> &DependencyCache {
        &self.context.cache
    }

    /// Read the configured command list and run it.
    pub fn run(&self) -> Result<BuildReport> {
        let commands = load_command_list(&self.context.settings.command_list)?;
        self.run_commands(&commands)
    }

    /// Run `commands`, then save the dependency cache.
    pub fn run_commands(&self, commands: &[BuildCommand]) -> Result<BuildReport> {
        let settings = &self.context.settings;
        log::info!(
            "Processing {} shader command(s) ({})",
            commands.len(),
            if settings.sequential {
                "sequential".to_string()
            } else {
                format!("{} worker(s)", settings.workers)
            }
        );

        let result = if settings.sequential {
            self.run_sequential(commands)
        } else {
            self.run_parallel(commands)
        };

        // Entries discovered before a failure are still valid.
        if let Err(e) = self.context.cache.save(&settings.cache_path) {
            if result.is_ok() {
                return Err(e);
            }
            log::warn!("{e}");
        }

        let report = result?;
        log::info!("{report}");
        Ok(report)
    }

    fn run_sequential(&self, commands: &[BuildCommand]) -> Result<BuildReport> {
        let mut report = BuildReport::default();
        for command in commands {
            match process_command(&self.context, command) {
                Ok(outcome) => report.commands.push(CommandReport {
                    command: command.clone(),
                    outcome,
                }),
                Err(e) => {
                    return Err(BuildError::CommandsFailed {
                        total: commands.len(),
                        failures: vec![CommandFailure {
                            command: command.describe(),
                            message: e.to_string(),
                        }],
                    });
                }
            }
        }
        Ok(report)
    }

    fn run_parallel(&self, commands: &[BuildCommand]) -> Result<BuildReport> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(self.context.settings.workers.max(1))
            .thread_name("shadergen-worker")
            .build()
            .map_err(BuildError::WorkerPool)?;

        let mut results: Vec<Option<Result<CommandOutcome>>> =
            commands.iter().map(|_| None).collect();

        runtime.block_on(async {
            let mut tasks = JoinSet::new();
            for (index, command) in commands.iter().cloned().enumerate() {
                let context = Arc::clone(&self.context);
                tasks.spawn_blocking(move || {
                    let outcome =
                        std::panic::catch_unwind(AssertUnwindSafe(|| {
                            process_command(&context, &command)
                        }))
                        .unwrap_or_else(|payload| {
                            Err(BuildError::WorkerPanicked {
                                command: command.describe(),
                                reason: panic_message(payload.as_ref()),
                            })
                        });
                    (index, outcome)
                });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, outcome)) => results[index] = Some(outcome),
                    Err(e) => log::error!("Shader worker did not complete: {e}"),
                }
            }
        });

        let mut report = BuildReport::default();
        let mut failures = Vec::new();
        for (command, result) in commands.iter().zip(results) {
            let result = result.unwrap_or_else(|| {
                Err(BuildError::WorkerPanicked {
                    command: command.describe(),
                    reason: "task was cancelled".to_string(),
                })
            });
            match result {
                Ok(outcome) => report.commands.push(CommandReport {
                    command: command.clone(),
                    outcome,
                }),
                Err(e) => failures.push(CommandFailure {
                    command: command.describe(),
                    message: e.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(BuildError::CommandsFailed {
                total: commands.len(),
                failures,
            })
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Process one command against `context`.
pub fn process_command(context: &BuildContext, command: &BuildCommand) -> Result<CommandOutcome> {
    let settings = &context.settings;
    let layout = &context.layout;

    let output_base = layout.resolve(&command.output_base);
    let artifacts = OutputArtifactSet::from_base(&output_base);
    let source_path = layout.resolve(&command.source);
    let search_path = layout.search_path(&command.libraries);
    let headers = layout.headers(&command.dialect, command.variant);
    let key = CacheKey::for_command(command);

    let dependencies = context
        .cache
        .get_or_compute(&key, &source_path, &search_path, &headers)?;
    let stale = settings.force
        || files_out_of_date(
            dependencies.iter().map(PathBuf::as_path),
            artifacts.all(),
        );

    // Current outputs are refreshed in dry runs too; only rebuilds are skipped.
    if !stale {
        touch_existing(artifacts.all())?;
        log::debug!("Up to date: {}", command.describe());
        return Ok(CommandOutcome::UpToDate);
    }

    if settings.dry_run {
        log::info!("Would rebuild {}", command.describe());
        return Ok(CommandOutcome::WouldRebuild);
    }

    log::info!(
        "Processing file {} dialect {} variant {}",
        command.source.display(),
        command.dialect,
        command.variant
    );

    if let Some(parent) = output_base.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }

    context
        .cache
        .regenerate(&key, &source_path, &search_path, &headers)?;

    let source = SourceUnit::read(&source_path)?;
    let options = headers
        .iter()
        .fold(ExpandOptions::new(), |options, header| options.header(header))
        .define(GL_PROFILE_DEFINE, settings.gl_profile.as_str());
    let expansion = process(&source, &search_path, &options)?;
    std::fs::write(&artifacts.expanded, &expansion.text)
        .map_err(|e| BuildError::io(&artifacts.expanded, e))?;

    context.toolchain.run_pipeline(&artifacts, &command.dialect)?;
    Ok(CommandOutcome::Rebuilt)
}
