//! Shader pipeline stage inferred from a scribe source extension.

use crate::error::{Result, ScribeError};
use std::fmt;
use std::path::Path;

/// Pipeline stage of a scribe source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageType {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

impl StageType {
    /// Infer the stage from the file extension (`.slv`, `.slf`, `.slg`, `.slc`).
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("slv") => Ok(StageType::Vertex),
            Some("slf") => Ok(StageType::Fragment),
            Some("slg") => Ok(StageType::Geometry),
            Some("slc") => Ok(StageType::Compute),
            _ => Err(ScribeError::UnknownStage {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Define token injected ahead of the processed body.
    pub fn define_token(self) -> &'static str {
        match self {
            StageType::Vertex => "GPU_VERTEX_SHADER",
            StageType::Fragment => "GPU_PIXEL_SHADER",
            StageType::Geometry => "GPU_GEOMETRY_SHADER",
            StageType::Compute => "GPU_COMPUTE_SHADER",
        }
    }

    /// Short name used by glslang-style tools.
    pub fn short_name(self) -> &'static str {
        match self {
            StageType::Vertex => "vert",
            StageType::Fragment => "frag",
            StageType::Geometry => "geom",
            StageType::Compute => "comp",
        }
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_from_extension() {
        assert_eq!(
            StageType::from_path(Path::new("a/b/skin.slv")).unwrap(),
            StageType::Vertex
        );
        assert_eq!(
            StageType::from_path(Path::new("deferred.slf")).unwrap(),
            StageType::Fragment
        );
        assert_eq!(
            StageType::from_path(Path::new("grid.slg")).unwrap(),
            StageType::Geometry
        );
        assert_eq!(
            StageType::from_path(Path::new("blur.slc")).unwrap(),
            StageType::Compute
        );
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = StageType::from_path(Path::new("Lighting.slh")).unwrap_err();
        assert!(matches!(err, ScribeError::UnknownStage { .. }));
        assert!(StageType::from_path(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_define_tokens() {
        assert_eq!(StageType::Vertex.define_token(), "GPU_VERTEX_SHADER");
        assert_eq!(StageType::Fragment.define_token(), "GPU_PIXEL_SHADER");
        assert_eq!(StageType::Geometry.define_token(), "GPU_GEOMETRY_SHADER");
        assert_eq!(StageType::Compute.define_token(), "GPU_COMPUTE_SHADER");
        assert_eq!(StageType::Fragment.to_string(), "frag");
    }
}
