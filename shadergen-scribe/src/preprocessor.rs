//! Scribe macro preprocessor.
//!
//! Rewrites scribe directives into native preprocessor text. Each pass is a
//! complete rewrite of the text produced by the previous one:
//!
//! 1. function blocks become multi-line `#define` macros, innermost first
//! 2. comment blocks are removed
//! 3. conditionals and plain defines become `#if`/`#elif`/`#else`/`#endif`/`#define`
//! 4. includes are resolved against the search path and become `#include <NAME>`
//! 5. any marker left over is rejected
//! 6. (full expansion only) headers, the stage define and caller defines are prepended
//!
//! [`discover_dependencies`] runs only the include scan of pass 4 and is what the
//! build cache uses to decide staleness without paying for a full expansion.

use crate::deps::DependencySet;
use crate::directive::{
    DIRECTIVE_CLOSE, DIRECTIVE_OPEN, Directive, Marker, find_leftover_marker, scan,
};
use crate::error::{Result, ScribeError};
use crate::include::IncludeSearchPath;
use crate::source::SourceUnit;
use std::convert::Infallible;
use std::path::{Path, PathBuf};

/// Bytes of text shown on each side of an offending marker in error messages.
const CONTEXT_RADIUS: usize = 80;

/// Extra input for a full expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Header files whose contents are prepended, in order.
    pub headers: Vec<PathBuf>,
    /// `#define NAME VALUE` pairs emitted after the stage define, in order.
    pub defines: Vec<(String, String)>,
}

impl ExpandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, path: impl Into<PathBuf>) -> Self {
        self.headers.push(path.into());
        self
    }

    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }
}

/// Result of a full expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Native preprocessor text ready for the compiler.
    pub text: String,
    /// Resolved includes, then the source itself, then the headers.
    pub dependencies: DependencySet,
}

/// Run every pass over `source` and prepend headers and defines.
pub fn process(
    source: &SourceUnit,
    search_path: &IncludeSearchPath,
    options: &ExpandOptions,
) -> Result<Expansion> {
    let path = source.path();
    log::debug!("Expanding {} ({})", path.display(), source.stage());

    let body = expand_functions(path, source.text())?;
    let body = strip_comments(&body);
    let body = translate_conditionals(&body);
    let (body, mut dependencies) = resolve_includes(path, &body, search_path)?;
    validate(path, &body)?;

    let mut sections = Vec::with_capacity(options.headers.len() + options.defines.len() + 2);
    for header in &options.headers {
        sections.push(read_file(header)?);
    }
    sections.push(format!("#define {}", source.stage().define_token()));
    for (name, value) in &options.defines {
        if value.is_empty() {
            sections.push(format!("#define {name}"));
        } else {
            sections.push(format!("#define {name} {value}"));
        }
    }
    sections.push(body);

    dependencies.insert(absolute(path));
    dependencies.extend(options.headers.iter().map(|h| absolute(h)));

    Ok(Expansion {
        text: sections.join("\n"),
        dependencies,
    })
}

/// Collect the files a source depends on without expanding it.
///
/// The result lists every include reachable from `source_path` (depth-first,
/// in order of first appearance), then `source_path`, then `headers`.
pub fn discover_dependencies(
    source_path: &Path,
    search_path: &IncludeSearchPath,
    headers: &[PathBuf],
) -> Result<DependencySet> {
    let text = read_file(source_path)?;
    let mut dependencies = DependencySet::new();
    collect_includes(source_path, &text, search_path, &mut dependencies)?;
    dependencies.insert(absolute(source_path));
    dependencies.extend(headers.iter().map(|h| absolute(h)));
    log::trace!(
        "Discovered {} dependencies for {}",
        dependencies.len(),
        source_path.display()
    );
    Ok(dependencies)
}

// ============================================================================
// Passes
// ============================================================================

struct OpenFunction<'a> {
    header: &'a str,
    offset: usize,
    body: String,
}

impl OpenFunction<'_> {
    fn into_define(self) -> String {
        let lines: Vec<&str> = self.body.lines().collect();
        format!("#define {} \\\n{}", self.header, lines.join(" \\\n"))
    }
}

fn push_text(stack: &mut [OpenFunction<'_>], output: &mut String, text: &str) {
    match stack.last_mut() {
        Some(open) => open.body.push_str(text),
        None => output.push_str(text),
    }
}

/// Pass 1: turn every `<@func@>` block into a `#define`.
///
/// Each `<@endfunc@>` closes the nearest preceding open `<@func@>`, so nested
/// blocks are converted before the block containing them, and the outer
/// macro body carries the inner `#define` rather than the inner markers.
pub fn expand_functions(path: &Path, text: &str) -> Result<String> {
    let mut output = String::with_capacity(text.len());
    let mut stack: Vec<OpenFunction<'_>> = Vec::new();
    let mut cursor = 0;
    let mut expanded = 0usize;

    for marker in scan(text) {
        match marker.directive {
            Directive::FunctionBegin { header, .. } => {
                push_text(&mut stack, &mut output, &text[cursor..marker.start]);
                stack.push(OpenFunction {
                    header,
                    offset: marker.start,
                    body: String::new(),
                });
            }
            Directive::FunctionEnd => {
                push_text(&mut stack, &mut output, &text[cursor..marker.start]);
                let Some(open) = stack.pop() else {
                    return Err(ScribeError::UnbalancedFunctionEnd {
                        path: path.to_path_buf(),
                        offset: marker.start,
                        fragment: context_around(text, marker.start),
                    });
                };
                let define = open.into_define();
                push_text(&mut stack, &mut output, &define);
                expanded += 1;
            }
            _ => continue,
        }
        cursor = marker.end;
    }

    if let Some(open) = stack.pop() {
        return Err(ScribeError::UnterminatedFunction {
            path: path.to_path_buf(),
            header: open.header.to_string(),
            offset: open.offset,
        });
    }

    output.push_str(&text[cursor..]);
    if expanded > 0 {
        log::trace!("Expanded {expanded} function block(s) in {}", path.display());
    }
    Ok(output)
}

/// Rewrite the markers of `text`, keeping those for which `rewrite` returns `None`.
fn try_rewrite_markers<'a, F, E>(text: &'a str, mut rewrite: F) -> std::result::Result<String, E>
where
    F: FnMut(&Marker<'a>) -> std::result::Result<Option<String>, E>,
{
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for marker in scan(text) {
        if let Some(replacement) = rewrite(&marker)? {
            output.push_str(&text[cursor..marker.start]);
            output.push_str(&replacement);
            cursor = marker.end;
        }
    }
    output.push_str(&text[cursor..]);
    Ok(output)
}

/// [`try_rewrite_markers`] for rewrites that cannot fail.
fn rewrite_markers<'a, F>(text: &'a str, mut rewrite: F) -> String
where
    F: FnMut(&Marker<'a>) -> Option<String>,
{
    let rewritten: std::result::Result<String, Infallible> =
        try_rewrite_markers(text, |marker| Ok(rewrite(marker)));
    match rewritten {
        Ok(text) => text,
        Err(never) => match never {},
    }
}

/// Pass 2: remove `<! ... !>` comment blocks.
pub fn strip_comments(text: &str) -> String {
    rewrite_markers(text, |marker| {
        matches!(marker.directive, Directive::CommentBlock).then(String::new)
    })
}

/// Pass 3: translate conditionals and plain defines to native directives.
pub fn translate_conditionals(text: &str) -> String {
    rewrite_markers(text, |marker| match marker.directive {
        Directive::If(condition) => Some(format!("#if {}", condition.to_native())),
        Directive::ElseIf(condition) => Some(format!("#elif {}", condition.to_native())),
        Directive::Else => Some("#else".to_string()),
        Directive::EndIf => Some("#endif".to_string()),
        Directive::Define(name) => Some(format!("#define {name}")),
        _ => None,
    })
}

/// Pass 4: resolve includes and rewrite them as `#include <NAME>`.
///
/// Returns the rewritten text and every include reachable from it.
pub fn resolve_includes(
    path: &Path,
    text: &str,
    search_path: &IncludeSearchPath,
) -> Result<(String, DependencySet)> {
    let mut dependencies = DependencySet::new();
    let rewritten = try_rewrite_markers(text, |marker| {
        let Directive::Include(name) = marker.directive else {
            return Ok(None);
        };
        include_file(path, name, search_path, &mut dependencies)?;
        Ok(Some(format!("#include <{name}>")))
    })?;
    Ok((rewritten, dependencies))
}

/// Pass 5: reject any marker that survived the previous passes.
pub fn validate(path: &Path, text: &str) -> Result<()> {
    let Some(offset) = find_leftover_marker(text) else {
        return Ok(());
    };
    Err(ScribeError::UnconsumedDirective {
        path: path.to_path_buf(),
        fragment: leftover_fragment(&text[offset..]),
        offset,
        context: context_around(text, offset),
    })
}

// ============================================================================
// Include discovery
// ============================================================================

fn collect_includes(
    path: &Path,
    text: &str,
    search_path: &IncludeSearchPath,
    dependencies: &mut DependencySet,
) -> Result<()> {
    for marker in scan(text) {
        if let Directive::Include(name) = marker.directive {
            include_file(path, name, search_path, dependencies)?;
        }
    }
    Ok(())
}

/// Resolve one include, record it, and follow its own includes the first
/// time it is seen.
fn include_file(
    path: &Path,
    name: &str,
    search_path: &IncludeSearchPath,
    dependencies: &mut DependencySet,
) -> Result<()> {
    let Some(resolved) = search_path.resolve(name) else {
        return Err(ScribeError::UnresolvedInclude {
            include: name.to_string(),
            source_path: path.to_path_buf(),
            searched: search_path.roots().to_vec(),
        });
    };

    if dependencies.insert(resolved.clone()) {
        log::trace!("{} includes {}", path.display(), resolved.display());
        let text = read_file(&resolved)?;
        collect_includes(&resolved, &text, search_path, dependencies)?;
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ScribeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// The leftover marker itself: up to its closer when it has one, otherwise
/// the rest of its line.
fn leftover_fragment(rest: &str) -> String {
    if rest.starts_with(DIRECTIVE_OPEN)
        && let Some(end) = rest[DIRECTIVE_OPEN.len()..].find(DIRECTIVE_CLOSE)
    {
        return rest[..DIRECTIVE_OPEN.len() + end + DIRECTIVE_CLOSE.len()].to_string();
    }
    rest.lines().next().unwrap_or(rest).to_string()
}

fn context_around(text: &str, offset: usize) -> String {
    let mut start = offset.saturating_sub(CONTEXT_RADIUS);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (offset + CONTEXT_RADIUS).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_string()
}
