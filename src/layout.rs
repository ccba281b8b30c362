//! Source tree layout: library roots and shader header locations.

use crate::command::Variant;
use shadergen_scribe::IncludeSearchPath;
use std::path::{Path, PathBuf};

/// Paths derived from the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    root: PathBuf,
}

impl SourceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/libraries`
    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    /// `<root>/libraries/shaders/headers`
    pub fn headers_dir(&self) -> PathBuf {
        self.libraries_dir().join("shaders").join("headers")
    }

    pub fn dialect_header(&self, dialect: &str) -> PathBuf {
        self.headers_dir().join(dialect).join("header.glsl")
    }

    pub fn variant_header(&self, variant: Variant) -> PathBuf {
        self.headers_dir().join(variant.header_file_name())
    }

    /// Dialect header then variant header, in injection order.
    pub fn headers(&self, dialect: &str, variant: Variant) -> Vec<PathBuf> {
        vec![self.dialect_header(dialect), self.variant_header(variant)]
    }

    /// Include search roots for a command's library list.
    pub fn search_path<S: AsRef<str>>(&self, libraries: &[S]) -> IncludeSearchPath {
        IncludeSearchPath::for_libraries(&self.libraries_dir(), libraries)
    }

    /// Resolve a path from the command list against the root.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_paths() {
        let layout = SourceLayout::new("/src/hifi");
        assert_eq!(
            layout.headers("310es", Variant::Stereo),
            vec![
                PathBuf::from("/src/hifi/libraries/shaders/headers/310es/header.glsl"),
                PathBuf::from("/src/hifi/libraries/shaders/headers/stereo.glsl"),
            ]
        );
    }

    #[test]
    fn test_search_path_roots() {
        let layout = SourceLayout::new("/src/hifi");
        let search = layout.search_path(&["gpu"]);
        assert_eq!(
            search.roots(),
            &[
                PathBuf::from("/src/hifi/libraries/gpu/src/gpu"),
                PathBuf::from("/src/hifi/libraries/gpu/src"),
            ]
        );
    }
}
