//! Scribe source files.

use crate::error::{Result, ScribeError};
use crate::stage::StageType;
use std::path::{Path, PathBuf};

/// A scribe source file: absolute path, raw text and inferred stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    path: PathBuf,
    text: String,
    stage: StageType,
}

impl SourceUnit {
    /// Read a source file from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let stage = StageType::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| ScribeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
            text,
            stage,
        })
    }

    /// Build a source unit from text already in memory.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let stage = StageType::from_path(&path)?;
        Ok(Self {
            path,
            text: text.into(),
            stage,
        })
    }

    /// Build a source unit with an explicit stage, whatever the extension.
    pub fn with_stage(path: impl Into<PathBuf>, text: impl Into<String>, stage: StageType) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            stage,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn stage(&self) -> StageType {
        self.stage
    }
}
