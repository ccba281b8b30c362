//! Shared integration test helpers for shadergen.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::ShaderTree;
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a subset
//! of helpers is used per test file.

#![allow(dead_code)]

use shadergen::config::BuildSettings;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Age given to every fixture file, so freshly generated artifacts are
/// always strictly newer regardless of filesystem timestamp granularity.
pub const FIXTURE_AGE: Duration = Duration::from_secs(3600);

/// Set a file's modification time.
pub fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::open(path)
        .expect("Failed to open file for mtime update")
        .set_modified(time)
        .expect("Failed to set mtime");
}

pub fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .expect("Failed to read mtime")
}

/// A temporary source tree, toolchain directory and build directory.
///
/// The layout created:
/// ```text
/// <tmp>/
///   src/
///     libraries/shaders/headers/
///       410/header.glsl
///       310es/header.glsl
///       mono.glsl
///       stereo.glsl
///   tools/
///   build/
/// ```
pub struct ShaderTree {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub tools: PathBuf,
    pub build: PathBuf,
}

impl ShaderTree {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("src");
        let tools = temp_dir.path().join("tools");
        let build = temp_dir.path().join("build");
        fs::create_dir_all(&tools).expect("Failed to create tools dir");
        fs::create_dir_all(&build).expect("Failed to create build dir");

        let tree = Self {
            temp_dir,
            root,
            tools,
            build,
        };
        tree.write(
            "libraries/shaders/headers/410/header.glsl",
            "#version 410 core",
        );
        tree.write(
            "libraries/shaders/headers/310es/header.glsl",
            "#version 310 es",
        );
        tree.write("libraries/shaders/headers/mono.glsl", "#define MONO 1");
        tree.write("libraries/shaders/headers/stereo.glsl", "#define STEREO 1");
        tree
    }

    /// Write a file under the source root, backdated by [`FIXTURE_AGE`].
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, contents).expect("Failed to write fixture");
        set_mtime(&path, SystemTime::now() - FIXTURE_AGE);
        path
    }

    /// Absolute path of a file under the source root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn dialect_header(&self, dialect: &str) -> PathBuf {
        self.path(&format!("libraries/shaders/headers/{dialect}/header.glsl"))
    }

    pub fn variant_header(&self, variant: &str) -> PathBuf {
        self.path(&format!("libraries/shaders/headers/{variant}.glsl"))
    }

    /// Write the command list and return its path.
    pub fn write_commands(&self, lines: &[&str]) -> PathBuf {
        let path = self.build.join("shadergen.txt");
        fs::write(&path, lines.join("\n")).expect("Failed to write command list");
        path
    }

    /// Settings pointing at this tree and `commands`.
    pub fn settings(&self, commands: &Path) -> BuildSettings {
        let mut settings = BuildSettings::new(commands, &self.tools, &self.build, &self.root);
        settings.workers = 2;
        settings.gl_profile = "PC_GL".to_string();
        settings
    }

    pub fn cache_path(&self) -> PathBuf {
        self.build.join("shaderDeps.json")
    }

    fn invocation_log(&self) -> PathBuf {
        self.temp_dir.path().join("invocations.log")
    }

    /// Lines appended by the stub toolchain, one per process run.
    pub fn invocations(&self) -> Vec<String> {
        match fs::read_to_string(self.invocation_log()) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Install shell-script stand-ins for the toolchain.
    ///
    /// Each stub logs its command line, then writes a placeholder to the path
    /// following `-o`/`--output`. The stub named `failing` instead prints a
    /// diagnostic and exits with status 2.
    #[cfg(unix)]
    pub fn install_stub_toolchain(&self, failing: Option<&str>) {
        use std::os::unix::fs::PermissionsExt;

        for program in ["glslangValidator", "spirv-opt", "spirv-cross"] {
            let script = if failing == Some(program) {
                format!(
                    "#!/bin/sh\necho \"{program} $*\" >> \"{log}\"\necho \"ERROR: {program} rejected the input\" >&2\nexit 2\n",
                    log = self.invocation_log().display()
                )
            } else {
                format!(
                    r#"#!/bin/sh
echo "{program} $*" >> "{log}"
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ] || [ "$prev" = "--output" ]; then out="$arg"; fi
  prev="$arg"
done
echo "{program} output" > "$out"
"#,
                    log = self.invocation_log().display()
                )
            };
            let path = self.tools.join(program);
            fs::write(&path, script).expect("Failed to write stub");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("Failed to make stub executable");
        }
    }
}
