//! External SPIR-V toolchain pipeline.
//!
//! Four stages run in strict sequence for each stale command, each consuming
//! the artifact the previous one produced:
//!
//! | Stage | Executable | Input | Output |
//! |-------|------------|-------|--------|
//! | compile | `glslangValidator` | `<base>` | `<base>.spv` |
//! | optimize | `spirv-opt` | `<base>.spv` | `<base>.opt.spv` |
//! | reflect | `spirv-cross` | `<base>.opt.spv` | `<base>.json` |
//! | cross-compile | `spirv-cross` | `<base>.opt.spv` | `<base>.glsl` |
//!
//! Processes run synchronously on the calling worker thread with no timeout.

use crate::command::{LEGACY_DIALECT, OutputArtifactSet};
use crate::error::{BuildError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainStage {
    Compile,
    Optimize,
    Reflect,
    CrossCompile,
}

impl ToolchainStage {
    /// All stages in execution order.
    pub const ALL: [ToolchainStage; 4] = [
        ToolchainStage::Compile,
        ToolchainStage::Optimize,
        ToolchainStage::Reflect,
        ToolchainStage::CrossCompile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolchainStage::Compile => "compile",
            ToolchainStage::Optimize => "optimize",
            ToolchainStage::Reflect => "reflect",
            ToolchainStage::CrossCompile => "cross-compile",
        }
    }

    /// Executable name without the platform suffix.
    pub fn program(self) -> &'static str {
        match self {
            ToolchainStage::Compile => "glslangValidator",
            ToolchainStage::Optimize => "spirv-opt",
            ToolchainStage::Reflect | ToolchainStage::CrossCompile => "spirv-cross",
        }
    }

    /// Command-line arguments for this stage.
    pub fn args(self, artifacts: &OutputArtifactSet, dialect: &str) -> Vec<OsString> {
        let path = |p: &Path| OsString::from(p);
        match self {
            ToolchainStage::Compile => vec![
                "-V110".into(),
                "-o".into(),
                path(&artifacts.unoptimized),
                path(&artifacts.expanded),
            ],
            ToolchainStage::Optimize => vec![
                "-O".into(),
                "-o".into(),
                path(&artifacts.optimized),
                path(&artifacts.unoptimized),
            ],
            ToolchainStage::Reflect => vec![
                "--reflect".into(),
                "json".into(),
                "--output".into(),
                path(&artifacts.reflection),
                path(&artifacts.optimized),
            ],
            ToolchainStage::CrossCompile => {
                let mut args = vec![
                    "--output".into(),
                    path(&artifacts.cross_compiled),
                    path(&artifacts.optimized),
                    "--version".into(),
                    dialect.into(),
                ];
                if dialect == LEGACY_DIALECT {
                    args.push("--no-420pack-extension".into());
                }
                args
            }
        }
    }
}

impl std::fmt::Display for ToolchainStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs pipeline stages from a directory of toolchain executables.
#[derive(Debug, Clone)]
pub struct Toolchain {
    bin_dir: PathBuf,
}

impl Toolchain {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }

    /// Full path of a stage's executable.
    pub fn executable(&self, stage: ToolchainStage) -> PathBuf {
        self.bin_dir.join(format!(
            "{}{}",
            stage.program(),
            std::env::consts::EXE_SUFFIX
        ))
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn run_pipeline(&self, artifacts: &OutputArtifactSet, dialect: &str) -> Result<()> {
        for stage in ToolchainStage::ALL {
            self.run_stage(stage, artifacts, dialect)?;
        }
        Ok(())
    }

    /// Run one stage and fail with its captured output on a non-zero exit.
    pub fn run_stage(
        &self,
        stage: ToolchainStage,
        artifacts: &OutputArtifactSet,
        dialect: &str,
    ) -> Result<()> {
        let program = self.executable(stage);
        let args = stage.args(artifacts, dialect);
        let command_line = command_line(&program, &args);
        log::debug!("Running {stage}: {command_line}");

        let output = Command::new(&program)
            .args(&args)
            .output()
            .map_err(|e| BuildError::Toolchain {
                stage: stage.name(),
                command_line: command_line.clone(),
                status: "failed to launch".to_string(),
                output: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(BuildError::toolchain_exit(
                stage.name(),
                command_line,
                output.status,
                &output.stdout,
                &output.stderr,
            ));
        }
        Ok(())
    }
}

/// Render an invocation for logs and error messages.
pub fn command_line(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.display().to_string())
        .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ")
}
