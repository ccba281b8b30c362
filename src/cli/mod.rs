//! Command-line interface for shadergen.
//!
//! Flags override the optional YAML config file field by field.

use crate::config::{ConfigError, ShadergenConfig};
use clap::Parser;
use std::path::PathBuf;

/// shadergen - Generate SPIR-V and cross-compiled shader artifacts from scribe sources
#[derive(Debug, Parser)]
#[command(name = "shadergen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Command list to execute
    #[arg(long, value_name = "PATH")]
    pub commands: Option<PathBuf>,

    /// Directory containing glslangValidator, spirv-opt and spirv-cross
    #[arg(long, alias = "spirv-binaries", value_name = "DIR")]
    pub tools_dir: Option<PathBuf>,

    /// Build directory (holds the dependency cache)
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Root of the source tree; command list paths are relative to it
    #[arg(long, value_name = "DIR")]
    pub source_dir: Option<PathBuf>,

    /// Process commands sequentially, in list order
    #[arg(short, long)]
    pub debug: bool,

    /// Rebuild every command regardless of timestamps
    #[arg(short, long)]
    pub force: bool,

    /// Report the commands that would be rebuilt without running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Worker pool size (default: available cores minus two)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Value of the GLPROFILE define (default depends on the host OS)
    #[arg(long, value_name = "NAME")]
    pub gl_profile: Option<String>,

    /// YAML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set log level (overrides config and RUST_LOG)
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,

    /// Mirror log output into a file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

impl Cli {
    /// Load the `--config` file, if any, and apply the flags on top of it.
    pub fn to_config(&self) -> Result<ShadergenConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ShadergenConfig::load(path)?,
            None => ShadergenConfig::default(),
        };
        self.apply_to(&mut config);
        Ok(config)
    }

    /// Override `config` with every flag that was given.
    pub fn apply_to(&self, config: &mut ShadergenConfig) {
        if let Some(path) = &self.commands {
            config.commands = Some(path.clone());
        }
        if let Some(dir) = &self.tools_dir {
            config.tools_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.build_dir {
            config.build_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.source_dir {
            config.source_dir = Some(dir.clone());
        }
        config.debug |= self.debug;
        config.force |= self.force;
        config.dry_run |= self.dry_run;
        if let Some(jobs) = self.jobs {
            config.jobs = Some(jobs);
        }
        if let Some(profile) = &self.gl_profile {
            config.gl_profile = profile.clone();
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
    }

    pub fn log_level(&self) -> Option<log::LevelFilter> {
        self.log_level.map(LogLevelArg::to_level_filter)
    }
}
