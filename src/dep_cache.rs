//! Dependency cache keyed by (source, dialect, variant).
//!
//! The map is guarded by a `parking_lot::Mutex` that is only held across the
//! map lookup or insert. Discovery runs without the lock, so two workers
//! racing on one key may both discover; the last insert wins and both values
//! are equal.
//!
//! The cache is loaded once at the start of a run and saved once at the end
//! as a JSON object mapping `source:dialect:variant` to a list of paths.

use crate::command::{BuildCommand, Variant};
use crate::error::{BuildError, Result};
use parking_lot::Mutex;
use shadergen_scribe::{DependencySet, IncludeSearchPath, discover_dependencies};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default cache file name inside the build directory.
pub const CACHE_FILE_NAME: &str = "shaderDeps.json";

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub source: PathBuf,
    pub dialect: String,
    pub variant: Variant,
}

impl CacheKey {
    pub fn new(source: impl Into<PathBuf>, dialect: impl Into<String>, variant: Variant) -> Self {
        Self {
            source: source.into(),
            dialect: dialect.into(),
            variant,
        }
    }

    pub fn for_command(command: &BuildCommand) -> Self {
        Self::new(&command.source, &command.dialect, command.variant)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.source.display(),
            self.dialect,
            self.variant
        )
    }
}

impl FromStr for CacheKey {
    type Err = String;

    /// Splits from the right so that source paths containing `:` survive.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let (Some(variant), Some(dialect), Some(source)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("malformed cache key '{s}'"));
        };
        if source.is_empty() || dialect.is_empty() {
            return Err(format!("malformed cache key '{s}'"));
        }
        Ok(Self::new(source, dialect, variant.parse::<Variant>()?))
    }
}

/// Thread-safe (source, dialect, variant) to [`DependencySet`] map.
#[derive(Debug, Default)]
pub struct DependencyCache {
    entries: Mutex<HashMap<CacheKey, DependencySet>>,
}

impl DependencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot, falling back to an empty cache on any problem.
    pub fn load(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(cache) => cache,
            Err(e) => {
                log::warn!("{e}; starting with an empty dependency cache");
                Self::new()
            }
        }
    }

    /// Load a snapshot. A missing or empty file is an empty cache.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No dependency cache at {}", path.display());
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(BuildError::CacheIo {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(Self::new());
        }

        let cache_io = |reason: String| BuildError::CacheIo {
            path: path.to_path_buf(),
            reason,
        };
        let raw: BTreeMap<String, Vec<PathBuf>> =
            serde_json::from_str(&text).map_err(|e| cache_io(e.to_string()))?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (key, paths) in raw {
            let key = key.parse::<CacheKey>().map_err(cache_io)?;
            entries.insert(key, DependencySet::from(paths));
        }
        log::debug!(
            "Loaded {} dependency cache entries from {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    /// Write the whole map to `path`, replacing any previous snapshot.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot: BTreeMap<String, Vec<PathBuf>> = self
            .entries
            .lock()
            .iter()
            .map(|(key, deps)| (key.to_string(), deps.paths().to_vec()))
            .collect();

        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| BuildError::CacheIo {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, json).map_err(|e| BuildError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, path).map_err(|e| BuildError::io(path, e))?;
        log::debug!(
            "Saved {} dependency cache entries to {}",
            snapshot.len(),
            path.display()
        );
        Ok(())
    }

    /// Copy of the cached set for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<DependencySet> {
        self.entries.lock().get(key).cloned()
    }

    /// Cached set for `key`, discovering and storing it on a miss.
    pub fn get_or_compute(
        &self,
        key: &CacheKey,
        source_path: &Path,
        search_path: &IncludeSearchPath,
        headers: &[PathBuf],
    ) -> Result<DependencySet> {
        if let Some(deps) = self.get(key) {
            log::trace!("Dependency cache hit for {key}");
            return Ok(deps);
        }
        log::trace!("Dependency cache miss for {key}");
        self.regenerate(key, source_path, search_path, headers)
    }

    /// Rediscover the set for `key` and overwrite the entry.
    pub fn regenerate(
        &self,
        key: &CacheKey,
        source_path: &Path,
        search_path: &IncludeSearchPath,
        headers: &[PathBuf],
    ) -> Result<DependencySet> {
        let deps = discover_dependencies(source_path, search_path, headers)?;
        self.insert(key.clone(), deps.clone());
        Ok(deps)
    }

    /// Store `deps` under `key`.
    pub fn insert(&self, key: CacheKey, deps: DependencySet) {
        self.entries.lock().insert(key, deps);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_round_trip_with_colon_in_path() {
        let key = CacheKey::new("C:/hifi/libraries/gpu/src/a.slv", "310es", Variant::Stereo);
        let text = key.to_string();
        assert_eq!(text, "C:/hifi/libraries/gpu/src/a.slv:310es:stereo");
        assert_eq!(text.parse::<CacheKey>().unwrap(), key);
    }

    #[test]
    fn test_malformed_keys() {
        assert!("a.slv".parse::<CacheKey>().is_err());
        assert!("a.slv:410".parse::<CacheKey>().is_err());
        assert!("a.slv:410:quad".parse::<CacheKey>().is_err());
        assert!(":410:mono".parse::<CacheKey>().is_err());
    }

    #[test]
    fn test_get_returns_independent_copies() {
        let cache = DependencyCache::new();
        let key = CacheKey::new("a.slv", "410", Variant::Mono);
        cache.insert(key.clone(), DependencySet::from(vec![PathBuf::from("/a.slv")]));

        let mut first = cache.get(&key).unwrap();
        first.insert("/extra.slh");
        assert_eq!(first.len(), 2);
        assert_eq!(cache.get(&key).unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_and_empty_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join(CACHE_FILE_NAME);
        assert!(DependencyCache::load_from(&path).unwrap().is_empty());

        std::fs::write(&path, "  \n").unwrap();
        assert!(DependencyCache::load_from(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join(CACHE_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            DependencyCache::load_from(&path),
            Err(BuildError::CacheIo { .. })
        ));
        assert!(DependencyCache::load(&path).is_empty());
    }

    #[test]
    fn test_saved_file_is_sorted_json() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join(CACHE_FILE_NAME);
        let cache = DependencyCache::new();
        cache.insert(
            CacheKey::new("b.slf", "410", Variant::Mono),
            DependencySet::from(vec![PathBuf::from("/b.slf")]),
        );
        cache.insert(
            CacheKey::new("a.slv", "410", Variant::Stereo),
            DependencySet::from(vec![PathBuf::from("/x.slh"), PathBuf::from("/a.slv")]),
        );
        cache.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let a = text.find("a.slv:410:stereo").unwrap();
        let b = text.find("b.slf:410:mono").unwrap();
        assert!(a < b);
        assert!(!path.with_extension("json.tmp").exists());

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["a.slv:410:stereo"][0], "/x.slh");
    }
}
