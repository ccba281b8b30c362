//! Typed error types for the shadergen build driver.
//!
//! Preprocessing failures arrive wrapped from [`shadergen_scribe::ScribeError`];
//! everything else (command list parsing, toolchain stages, cache persistence,
//! artifact I/O) is described here so callers can match on the failing step
//! instead of an opaque `anyhow` string.

use shadergen_scribe::ScribeError;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced while planning or executing shader builds.
#[derive(Debug, Error)]
pub enum BuildError {
    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------
    /// A command list line could not be parsed.
    #[error("Invalid build command on line {line_number} ('{line}'): {reason}")]
    CommandParse {
        /// 1-based line number in the command list.
        line_number: usize,
        /// The offending line.
        line: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Scribe preprocessing or dependency discovery failed.
    #[error(transparent)]
    Scribe(#[from] ScribeError),

    // -----------------------------------------------------------------------
    // Toolchain
    // -----------------------------------------------------------------------
    /// An external toolchain stage could not be launched or exited non-zero.
    #[error("{stage} stage failed ({status}): {command_line}\n{output}")]
    Toolchain {
        /// Stage name (compile, optimize, reflect, cross-compile).
        stage: &'static str,
        /// The full invocation, program first.
        command_line: String,
        /// Exit status, or the launch failure.
        status: String,
        /// Captured standard output and standard error.
        output: String,
    },

    // -----------------------------------------------------------------------
    // Files
    // -----------------------------------------------------------------------
    /// The persisted dependency cache could not be read or parsed.
    #[error("Dependency cache '{}' is unreadable: {reason}", .path.display())]
    CacheIo {
        /// Cache file location.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// An artifact, directory or input file operation failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // -----------------------------------------------------------------------
    // Run-level
    // -----------------------------------------------------------------------
    /// One or more commands of a run failed.
    #[error("{} of {total} shader command(s) failed:\n{}", .failures.len(), format_failures(.failures))]
    CommandsFailed {
        /// Number of commands in the run.
        total: usize,
        /// Each failed command with its error message, in command-list order.
        failures: Vec<CommandFailure>,
    },

    /// The worker pool runtime could not be started.
    #[error("Failed to start the shader worker pool: {0}")]
    WorkerPool(#[source] std::io::Error),

    /// A worker task panicked or was cancelled before reporting a result.
    #[error("Shader worker for '{command}' did not complete: {reason}")]
    WorkerPanicked {
        /// Command the worker was processing.
        command: String,
        /// Join error description.
        reason: String,
    },
}

/// One failed command inside [`BuildError::CommandsFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// Command description (`source dialect variant`).
    pub command: String,
    /// Rendered error chain.
    pub message: String,
}

fn format_failures(failures: &[CommandFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  {}: {}", f.command, f.message))
        .collect::<Vec<_>>()
        .join("\n")
}

impl BuildError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a toolchain error from a completed process.
    pub(crate) fn toolchain_exit(
        stage: &'static str,
        command_line: String,
        status: ExitStatus,
        stdout: &[u8],
        stderr: &[u8],
    ) -> Self {
        let mut output = String::from_utf8_lossy(stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(stderr);
        if !stderr.trim().is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(stderr.trim_end());
        }
        BuildError::Toolchain {
            stage,
            command_line,
            status: status.to_string(),
            output,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BuildError>;
