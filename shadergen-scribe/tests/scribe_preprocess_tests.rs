//! Integration tests for scribe preprocessing and dependency discovery.
//!
//! Each test builds a small library tree in a temporary directory laid out
//! the way shadergen expects (`libraries/<lib>/src/<lib>/...`).

use shadergen_scribe::{
    ExpandOptions, IncludeSearchPath, ScribeError, SourceUnit, discover_dependencies, process,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, contents).expect("Failed to write file");
    path.to_path_buf()
}

fn libraries(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("libraries")
}

const SKINNED_VERTEX: &str = r#"<!
//  skinned.slv
//  Generated on <$_SCRIBE_DATE$>
!>
<@include gpu/Inputs.slh@>
<@include Skinning.slh@>

<@func declareOutput(name)@>
<@if GLPROFILE == PC_GL@>
layout(location=0) out vec4 name;
<@else@>
out vec4 name;
<@endif@>
<@endfunc@>

<@def SKINNED@>
<@if not HIGH_QUALITY@>
#define SAMPLES 4
<@elif SKINNED@>
#define SAMPLES 16
<@endif@>

void main(void) {
    gl_Position = vec4(0.0);
}
"#;

#[test]
fn test_full_expansion_consumes_every_marker() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let libs = libraries(&temp_dir);
    write(&libs.join("gpu/src/gpu/Inputs.slh"), "in vec4 inPosition;\n");
    write(
        &libs.join("render-utils/src/render-utils/Skinning.slh"),
        "<@func declareSkin()@>\nuniform mat4 bones[64];\n<@endfunc@>\n",
    );
    let header = write(&temp_dir.path().join("headers/410/header.glsl"), "#version 410 core");
    let source_path = write(&libs.join("render-utils/src/skinned.slv"), SKINNED_VERTEX);

    let search = IncludeSearchPath::for_libraries(&libs, &["gpu", "render-utils"]);
    let source = SourceUnit::read(&source_path).expect("source should load");
    let options = ExpandOptions::new()
        .header(&header)
        .define("GLPROFILE", "PC_GL");

    let expansion = process(&source, &search, &options).expect("expansion should succeed");

    assert!(!expansion.text.contains("<@"));
    assert!(!expansion.text.contains("<!"));
    assert!(expansion.text.starts_with(
        "#version 410 core\n#define GPU_VERTEX_SHADER\n#define GLPROFILE PC_GL\n"
    ));
    assert!(expansion.text.contains("#include <gpu/Inputs.slh>"));
    assert!(expansion.text.contains("#include <Skinning.slh>"));
    assert!(expansion.text.contains("#define declareOutput(name) \\"));
    assert!(expansion.text.contains("#if (GLPROFILE == PC_GL)"));
    assert!(expansion.text.contains("#if !defined(HIGH_QUALITY)"));
    assert!(expansion.text.contains("#elif defined(SKINNED)"));
    assert!(expansion.text.contains("#define SKINNED\n"));
    assert!(!expansion.text.contains("_SCRIBE_DATE"));

    let deps: Vec<PathBuf> = expansion.dependencies.iter().cloned().collect();
    assert_eq!(
        deps,
        vec![
            libs.join("gpu/src/gpu/Inputs.slh"),
            libs.join("render-utils/src/render-utils/Skinning.slh"),
            source_path,
            header,
        ]
    );
}

#[test]
fn test_first_search_root_is_selected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let libs = libraries(&temp_dir);
    let nested = write(&libs.join("gpu/src/gpu/Color.slh"), "// nested");
    write(&libs.join("gpu/src/Color.slh"), "// source root");
    let source_path = write(&temp_dir.path().join("a.slf"), "<@include Color.slh@>\n");

    let search = IncludeSearchPath::for_libraries(&libs, &["gpu"]);
    let deps = discover_dependencies(&source_path, &search, &[]).expect("discovery should work");
    assert_eq!(deps.paths()[0], nested);
}

#[test]
fn test_discovery_order_and_headers() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let libs = libraries(&temp_dir);
    let b = write(&libs.join("gpu/src/gpu/b.slh"), "float b;\n");
    let source_path = write(&temp_dir.path().join("a.slv"), "<@include b.slh@>\nvoid main() {}\n");
    let dialect = temp_dir.path().join("headers/410/header.glsl");
    let variant = temp_dir.path().join("headers/mono.glsl");

    let search = IncludeSearchPath::for_libraries(&libs, &["gpu"]);
    let deps = discover_dependencies(&source_path, &search, &[dialect.clone(), variant.clone()])
        .expect("discovery should work");

    assert_eq!(deps.paths(), &[b, source_path, dialect, variant]);
}

#[test]
fn test_discovery_follows_nested_includes_once() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let libs = libraries(&temp_dir);
    let lighting = write(
        &libs.join("render/src/render/Lighting.slh"),
        "<@include Math.slh@>\n<@include Light.slh@>\n",
    );
    let math = write(&libs.join("render/src/render/Math.slh"), "// math\n");
    // Cycle back to Lighting; must not loop.
    let light = write(
        &libs.join("render/src/Light.slh"),
        "<@include Lighting.slh@>\n<@include Math.slh@>\n",
    );
    let source_path = write(
        &temp_dir.path().join("deferred.slf"),
        "<@include Lighting.slh@>\n<@include Math.slh@>\n",
    );

    let search = IncludeSearchPath::for_libraries(&libs, &["render"]);
    let deps = discover_dependencies(&source_path, &search, &[]).expect("discovery should work");
    assert_eq!(deps.paths(), &[lighting, math, light, source_path]);
}

#[test]
fn test_includes_inside_comments_are_ignored() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let source_path = write(
        &temp_dir.path().join("a.slv"),
        "<! <@include Missing.slh@> !>\nvoid main() {}\n",
    );
    let deps = discover_dependencies(&source_path, &IncludeSearchPath::new(), &[])
        .expect("commented include should be skipped");
    assert_eq!(deps.len(), 1);
}

#[test]
fn test_unresolved_include_names_file_and_roots() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let libs = libraries(&temp_dir);
    let source_path = write(&temp_dir.path().join("a.slv"), "<@include Nowhere.slh@>\n");
    let search = IncludeSearchPath::for_libraries(&libs, &["gpu"]);

    let err = discover_dependencies(&source_path, &search, &[]).unwrap_err();
    match &err {
        ScribeError::UnresolvedInclude {
            include,
            source_path: from,
            searched,
        } => {
            assert_eq!(include, "Nowhere.slh");
            assert_eq!(from, &source_path);
            assert_eq!(searched.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("Nowhere.slh"));
    assert!(message.contains("a.slv"));

    let source = SourceUnit::read(&source_path).expect("source should load");
    let err = process(&source, &search, &ExpandOptions::new()).unwrap_err();
    assert!(matches!(err, ScribeError::UnresolvedInclude { .. }));
}

#[test]
fn test_unsupported_directive_is_rejected() {
    let source = SourceUnit::from_text("/virtual/a.slf", "<@if A B@>\nx\n<@endif@>\n")
        .expect("source should build");
    let err = process(&source, &IncludeSearchPath::new(), &ExpandOptions::new()).unwrap_err();
    match err {
        ScribeError::UnconsumedDirective { fragment, .. } => assert_eq!(fragment, "<@if A B@>"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_stray_function_end_is_rejected() {
    let source = SourceUnit::from_text("/virtual/a.slc", "void main() {}\n<@endfunc@>\n")
        .expect("source should build");
    let err = process(&source, &IncludeSearchPath::new(), &ExpandOptions::new()).unwrap_err();
    assert!(matches!(err, ScribeError::UnbalancedFunctionEnd { .. }));
}

#[test]
fn test_stage_define_per_extension() {
    let cases = [
        ("a.slv", "#define GPU_VERTEX_SHADER"),
        ("a.slf", "#define GPU_PIXEL_SHADER"),
        ("a.slg", "#define GPU_GEOMETRY_SHADER"),
        ("a.slc", "#define GPU_COMPUTE_SHADER"),
    ];
    for (name, expected) in cases {
        let source = SourceUnit::from_text(format!("/virtual/{name}"), "void main() {}")
            .expect("source should build");
        let expansion = process(&source, &IncludeSearchPath::new(), &ExpandOptions::new())
            .expect("expansion should succeed");
        assert_eq!(expansion.text, format!("{expected}\nvoid main() {{}}"));
    }
}

#[test]
fn test_missing_header_is_io_error() {
    let source = SourceUnit::from_text("/virtual/a.slv", "void main() {}").unwrap();
    let options = ExpandOptions::new().header("/definitely/not/here/header.glsl");
    let err = process(&source, &IncludeSearchPath::new(), &options).unwrap_err();
    assert!(matches!(err, ScribeError::Io { .. }));
}
