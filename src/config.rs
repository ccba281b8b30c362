//! Run configuration.
//!
//! [`ShadergenConfig`] is the raw, optional-everything value read from a YAML
//! file and overridden by CLI flags. [`ShadergenConfig::resolve`] validates it
//! into [`BuildSettings`], which the orchestrator receives explicitly.

use crate::dep_cache::CACHE_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Worker threads kept free for the enclosing build system.
pub const RESERVED_WORKERS: usize = 2;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`ShadergenConfig`].
    #[error("YAML parse error in config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// A field is missing or has an invalid value.
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings for one shadergen run, as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadergenConfig {
    /// Command list file.
    pub commands: Option<PathBuf>,
    /// Directory holding `glslangValidator`, `spirv-opt` and `spirv-cross`.
    pub tools_dir: Option<PathBuf>,
    /// Build directory; holds the dependency cache.
    pub build_dir: Option<PathBuf>,
    /// Source root that command list paths are relative to.
    pub source_dir: Option<PathBuf>,
    /// Process commands one at a time, in list order.
    pub debug: bool,
    /// Treat every command as stale.
    pub force: bool,
    /// Report stale commands without rebuilding them.
    pub dry_run: bool,
    /// Worker pool size override.
    pub jobs: Option<usize>,
    /// Value of the `GLPROFILE` define.
    pub gl_profile: String,
    /// Dependency cache file name inside the build directory.
    pub cache_file_name: String,
    /// off/error/warn/info/debug/trace
    pub log_level: Option<String>,
    /// Mirror log output into this file.
    pub log_file: Option<PathBuf>,
}

impl Default for ShadergenConfig {
    fn default() -> Self {
        Self {
            commands: None,
            tools_dir: None,
            build_dir: None,
            source_dir: None,
            debug: false,
            force: false,
            dry_run: false,
            jobs: None,
            gl_profile: default_gl_profile().to_string(),
            cache_file_name: CACHE_FILE_NAME.to_string(),
            log_level: None,
            log_file: None,
        }
    }
}

/// `GLPROFILE` value for the host OS.
pub fn default_gl_profile() -> &'static str {
    if cfg!(target_os = "macos") {
        "MAC_GL"
    } else if cfg!(unix) {
        "LINUX_GL"
    } else {
        "PC_GL"
    }
}

/// Available hardware parallelism minus [`RESERVED_WORKERS`], at least one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(RESERVED_WORKERS)
        .max(1)
}

impl ShadergenConfig {
    /// Load from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loading config from {}", path.display());
        Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml_ng::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(contents)
    }

    /// Check required locations and produce the settings for a run.
    pub fn resolve(&self) -> Result<BuildSettings, ConfigError> {
        fn required(value: &Option<PathBuf>, flag: &str) -> Result<PathBuf, ConfigError> {
            value
                .clone()
                .ok_or_else(|| ConfigError::Validation(format!("{flag} is required")))
        }

        let command_list = required(&self.commands, "--commands")?;
        let tools_dir = required(&self.tools_dir, "--tools-dir")?;
        let build_dir = required(&self.build_dir, "--build-dir")?;
        let source_dir = required(&self.source_dir, "--source-dir")?;

        if self.jobs == Some(0) {
            return Err(ConfigError::Validation(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.gl_profile.trim().is_empty() || self.gl_profile.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "gl_profile must be a single token, got '{}'",
                self.gl_profile
            )));
        }
        if self.cache_file_name.is_empty() || self.cache_file_name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "cache_file_name must be a plain file name, got '{}'",
                self.cache_file_name
            )));
        }

        let cache_path = build_dir.join(&self.cache_file_name);
        Ok(BuildSettings {
            command_list,
            tools_dir,
            source_dir,
            sequential: self.debug,
            force: self.force,
            dry_run: self.dry_run,
            workers: self.jobs.unwrap_or_else(default_worker_count),
            gl_profile: self.gl_profile.clone(),
            cache_path,
        })
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub command_list: PathBuf,
    pub tools_dir: PathBuf,
    pub source_dir: PathBuf,
    pub sequential: bool,
    pub force: bool,
    pub dry_run: bool,
    pub workers: usize,
    pub gl_profile: String,
    pub cache_path: PathBuf,
}

impl BuildSettings {
    /// Settings with defaults for everything but the four locations.
    pub fn new(
        command_list: impl Into<PathBuf>,
        tools_dir: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
    ) -> Self {
        let build_dir: PathBuf = build_dir.into();
        Self {
            command_list: command_list.into(),
            tools_dir: tools_dir.into(),
            cache_path: build_dir.join(CACHE_FILE_NAME),
            source_dir: source_dir.into(),
            sequential: false,
            force: false,
            dry_run: false,
            workers: default_worker_count(),
            gl_profile: default_gl_profile().to_string(),
        }
    }
}
