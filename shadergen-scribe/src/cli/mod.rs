//! Command-line interface for the standalone `scribe` preprocessor.
//!
//! Expands one scribe source outside a shadergen build, or lists the files it
//! depends on with `-M`.

use crate::error::{Result, ScribeError};
use crate::include::IncludeSearchPath;
use crate::preprocessor::{ExpandOptions, discover_dependencies, process};
use crate::source::SourceUnit;
use crate::stage::StageType;
use clap::{ArgAction, Parser};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Display name used for source text read from standard input.
const STDIN_NAME: &str = "<stdin>";

/// scribe - Expand scribe shader directives into plain GLSL
#[derive(Debug, Parser)]
#[command(name = "scribe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source file (default: standard input)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output file (default: standard output)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Emit `#define NAME VALUE` after the stage define (repeatable)
    #[arg(
        short = 'D',
        long = "define",
        num_args = 2,
        value_names = ["NAME", "VALUE"],
        action = ArgAction::Append
    )]
    pub defines: Vec<String>,

    /// Shader stage (default: inferred from the input extension, else vert)
    #[arg(short = 'T', long = "type", value_enum, value_name = "STAGE")]
    pub stage: Option<StageArg>,

    /// Directory searched for includes, in order (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,

    /// Header file prepended to the output, in order (repeatable)
    #[arg(short = 'H', long = "header", value_name = "PATH")]
    pub headers: Vec<PathBuf>,

    /// List the files the input depends on instead of expanding it
    #[arg(short = 'M', long, requires = "input")]
    pub list_dependencies: bool,
}

/// Stage argument for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StageArg {
    Vert,
    Frag,
    Geom,
    Comp,
}

impl From<StageArg> for StageType {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Vert => StageType::Vertex,
            StageArg::Frag => StageType::Fragment,
            StageArg::Geom => StageType::Geometry,
            StageArg::Comp => StageType::Compute,
        }
    }
}

impl Cli {
    /// Include roots in the order given.
    pub fn search_path(&self) -> IncludeSearchPath {
        self.include_dirs.iter().cloned().collect()
    }

    /// Headers and `-D` pairs as expansion options.
    pub fn expand_options(&self) -> ExpandOptions {
        let options = self
            .headers
            .iter()
            .fold(ExpandOptions::new(), |options, header| options.header(header));
        self.defines
            .chunks_exact(2)
            .fold(options, |options, pair| options.define(&pair[0], &pair[1]))
    }

    /// `-T` if given, otherwise the stage implied by the input extension,
    /// otherwise vertex.
    pub fn stage_for(&self, path: Option<&Path>) -> StageType {
        if let Some(stage) = self.stage {
            return stage.into();
        }
        path.and_then(|p| StageType::from_path(p).ok())
            .unwrap_or(StageType::Vertex)
    }

    /// Read the input file, or standard input when none was given.
    pub fn read_source(&self) -> Result<SourceUnit> {
        match &self.input {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ScribeError::Io {
                    path: path.clone(),
                    source,
                })?;
                let absolute = std::path::absolute(path).unwrap_or_else(|_| path.clone());
                Ok(SourceUnit::with_stage(absolute, text, self.stage_for(Some(path))))
            }
            None => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .map_err(|source| ScribeError::Io {
                        path: PathBuf::from(STDIN_NAME),
                        source,
                    })?;
                Ok(SourceUnit::with_stage(STDIN_NAME, text, self.stage_for(None)))
            }
        }
    }

    /// Produce the text this invocation writes: the expanded source, or one
    /// dependency path per line with `-M`.
    pub fn execute(&self) -> Result<String> {
        let search_path = self.search_path();

        if self.list_dependencies {
            let Some(input) = &self.input else {
                return Err(ScribeError::Io {
                    path: PathBuf::from(STDIN_NAME),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "dependency listing needs an input file",
                    ),
                });
            };
            let deps = discover_dependencies(input, &search_path, &self.headers)?;
            let mut listing = String::new();
            for path in deps.iter() {
                listing.push_str(&path.display().to_string());
                listing.push('\n');
            }
            return Ok(listing);
        }

        let source = self.read_source()?;
        let expansion = process(&source, &search_path, &self.expand_options())?;
        log::debug!(
            "Expanded {} with {} dependencies",
            source.path().display(),
            expansion.dependencies.len()
        );
        Ok(expansion.text)
    }
}
