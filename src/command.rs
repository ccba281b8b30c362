//! Build commands and the artifacts they produce.
//!
//! A command list holds one command per line:
//!
//! ```text
//! dialect;variant;sourcePath;outputBasePath;lib1;lib2;...
//! ```
//!
//! Paths are relative to the source root. Blank lines and `#` comments are
//! skipped.

use crate::error::{BuildError, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Dialect whose cross-compiled output must avoid the 420pack extension.
pub const LEGACY_DIALECT: &str = "410";

/// Rendering mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    Mono,
    Stereo,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Mono => "mono",
            Variant::Stereo => "stereo",
        }
    }

    /// File name of the variant header under the shader headers directory.
    pub fn header_file_name(self) -> &'static str {
        match self {
            Variant::Mono => "mono.glsl",
            Variant::Stereo => "stereo.glsl",
        }
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mono" => Ok(Variant::Mono),
            "stereo" => Ok(Variant::Stereo),
            other => Err(format!("unknown variant '{other}' (expected mono or stereo)")),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the command list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    /// Target shading-language profile, e.g. `410` or `310es`.
    pub dialect: String,
    pub variant: Variant,
    /// Scribe source, relative to the source root.
    pub source: PathBuf,
    /// Output base path, relative to the source root.
    pub output_base: PathBuf,
    /// Libraries whose directories make up the include search path.
    pub libraries: Vec<String>,
}

impl BuildCommand {
    /// Parse a single `;`-separated command line.
    pub fn parse(line: &str, line_number: usize) -> Result<Self> {
        let invalid = |reason: String| BuildError::CommandParse {
            line_number,
            line: line.to_string(),
            reason,
        };

        let mut fields = line.trim().split(';').map(str::trim);
        let mut required = |name: &str| {
            fields
                .next()
                .filter(|f| !f.is_empty())
                .ok_or_else(|| format!("missing {name} field"))
        };

        let dialect = required("dialect").map_err(invalid)?.to_string();
        let variant = required("variant")
            .map_err(invalid)?
            .parse::<Variant>()
            .map_err(invalid)?;
        let source = PathBuf::from(required("source").map_err(invalid)?);
        let output_base = PathBuf::from(required("output").map_err(invalid)?);
        let libraries = fields
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            dialect,
            variant,
            source,
            output_base,
            libraries,
        })
    }

    /// Short human-readable description used in logs and error reports.
    pub fn describe(&self) -> String {
        format!(
            "{} dialect {} variant {}",
            self.source.display(),
            self.dialect,
            self.variant
        )
    }
}

/// Parse a whole command list.
pub fn parse_command_list(text: &str) -> Result<Vec<BuildCommand>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| BuildCommand::parse(line, index + 1))
        .collect()
}

/// Read and parse a command list file.
pub fn load_command_list(path: &Path) -> Result<Vec<BuildCommand>> {
    let text = std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    let commands = parse_command_list(&text)?;
    log::debug!(
        "Loaded {} build command(s) from {}",
        commands.len(),
        path.display()
    );
    Ok(commands)
}

/// The five files generated for one command, all derived from the output base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifactSet {
    /// Expanded scribe output (`<base>`).
    pub expanded: PathBuf,
    /// Unoptimized SPIR-V (`<base>.spv`).
    pub unoptimized: PathBuf,
    /// Optimized SPIR-V (`<base>.opt.spv`).
    pub optimized: PathBuf,
    /// Reflection metadata (`<base>.json`).
    pub reflection: PathBuf,
    /// Cross-compiled target-dialect text (`<base>.glsl`).
    pub cross_compiled: PathBuf,
}

impl OutputArtifactSet {
    pub fn from_base(base: &Path) -> Self {
        Self {
            expanded: base.to_path_buf(),
            unoptimized: with_suffix(base, ".spv"),
            optimized: with_suffix(base, ".opt.spv"),
            reflection: with_suffix(base, ".json"),
            cross_compiled: with_suffix(base, ".glsl"),
        }
    }

    /// All artifacts in pipeline order.
    pub fn all(&self) -> [&Path; 5] {
        [
            &self.expanded,
            &self.unoptimized,
            &self.optimized,
            &self.reflection,
            &self.cross_compiled,
        ]
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_with_libraries() {
        let cmd = BuildCommand::parse(
            "410;stereo;libraries/render-utils/src/model.slv;build/shaders/410/model;gpu;graphics;render-utils",
            1,
        )
        .unwrap();
        assert_eq!(cmd.dialect, "410");
        assert_eq!(cmd.variant, Variant::Stereo);
        assert_eq!(cmd.source, PathBuf::from("libraries/render-utils/src/model.slv"));
        assert_eq!(cmd.output_base, PathBuf::from("build/shaders/410/model"));
        assert_eq!(cmd.libraries, vec!["gpu", "graphics", "render-utils"]);
    }

    #[test]
    fn test_parse_command_without_libraries() {
        let cmd = BuildCommand::parse("310es;mono;a.slf;out/a", 3).unwrap();
        assert!(cmd.libraries.is_empty());
        assert_eq!(cmd.describe(), "a.slf dialect 310es variant mono");

        let cmd = BuildCommand::parse("310es;mono;a.slf;out/a;", 3).unwrap();
        assert!(cmd.libraries.is_empty());
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = BuildCommand::parse("410;mono;a.slv", 7).unwrap_err();
        match err {
            BuildError::CommandParse {
                line_number,
                reason,
                ..
            } => {
                assert_eq!(line_number, 7);
                assert!(reason.contains("output"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = BuildCommand::parse("410;quad;a.slv;out/a", 2).unwrap_err();
        assert!(err.to_string().contains("unknown variant 'quad'"));
    }

    #[test]
    fn test_command_list_skips_blank_and_comment_lines() {
        let text = "# generated by cmake\n\n410;mono;a.slv;out/a;gpu\n  \n410;stereo;a.slv;out/a_stereo;gpu\n";
        let commands = parse_command_list(text).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[1].variant, Variant::Stereo);

        let err = parse_command_list("410;mono;a.slv;out/a\nbroken\n").unwrap_err();
        assert!(matches!(err, BuildError::CommandParse { line_number: 2, .. }));
    }

    #[test]
    fn test_artifact_paths() {
        let artifacts = OutputArtifactSet::from_base(Path::new("/build/410/skin.vert"));
        assert_eq!(artifacts.expanded, PathBuf::from("/build/410/skin.vert"));
        assert_eq!(artifacts.unoptimized, PathBuf::from("/build/410/skin.vert.spv"));
        assert_eq!(artifacts.optimized, PathBuf::from("/build/410/skin.vert.opt.spv"));
        assert_eq!(artifacts.reflection, PathBuf::from("/build/410/skin.vert.json"));
        assert_eq!(artifacts.cross_compiled, PathBuf::from("/build/410/skin.vert.glsl"));
        assert_eq!(artifacts.all().len(), 5);
    }
}
