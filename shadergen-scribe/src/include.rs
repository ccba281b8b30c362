//! Include search path.

use std::path::{Path, PathBuf};

/// Ordered list of directories searched for `<@include NAME@>` targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeSearchPath {
    roots: Vec<PathBuf>,
}

impl IncludeSearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the search path for a list of library names.
    ///
    /// Each library contributes two roots, in order: its nested same-name
    /// directory `<libraries_dir>/<lib>/src/<lib>/`, then its source root
    /// `<libraries_dir>/<lib>/src/`.
    pub fn for_libraries<S: AsRef<str>>(libraries_dir: &Path, libraries: &[S]) -> Self {
        let mut search_path = Self::new();
        for lib in libraries {
            let lib = lib.as_ref();
            let src = libraries_dir.join(lib).join("src");
            search_path.push(src.join(lib));
            search_path.push(src);
        }
        search_path
    }

    pub fn push(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// First root containing a file named `name`, as an absolute path.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.roots.iter().find_map(|root| {
            let candidate = root.join(name);
            if !candidate.is_file() {
                return None;
            }
            Some(std::path::absolute(&candidate).unwrap_or(candidate))
        })
    }
}

impl FromIterator<PathBuf> for IncludeSearchPath {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            roots: iter.into_iter().collect(),
        }
    }
}
