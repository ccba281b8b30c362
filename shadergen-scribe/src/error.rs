//! Typed error types for shadergen-scribe.
//!
//! Every failure is fatal for the file being processed. Callers at the crate
//! boundary can match on the variant to tell malformed directive syntax apart
//! from include resolution and I/O problems.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while scanning, preprocessing or discovering dependencies.
#[derive(Debug, Error)]
pub enum ScribeError {
    // -----------------------------------------------------------------------
    // Parse errors
    // -----------------------------------------------------------------------
    /// An `<@endfunc@>` marker was found with no open `<@func ...@>` block.
    #[error("Unbalanced <@endfunc@> in '{}' at byte {offset}: {fragment}", .path.display())]
    UnbalancedFunctionEnd {
        /// Source file being processed.
        path: PathBuf,
        /// Byte offset of the offending marker.
        offset: usize,
        /// Text surrounding the marker.
        fragment: String,
    },

    /// A `<@func ...@>` block was never closed.
    #[error("Unterminated <@func {header}@> in '{}' at byte {offset}", .path.display())]
    UnterminatedFunction {
        /// Source file being processed.
        path: PathBuf,
        /// Raw `NAME ARGS` header of the open block.
        header: String,
        /// Byte offset of the opening marker.
        offset: usize,
    },

    /// A directive marker survived every pass, meaning its syntax is
    /// malformed or unsupported.
    #[error(
        "Unconsumed directive '{fragment}' in '{}' at byte {offset}:\n{context}",
        .path.display()
    )]
    UnconsumedDirective {
        /// Source file being processed.
        path: PathBuf,
        /// The leftover marker text.
        fragment: String,
        /// Byte offset of the leftover marker in the processed text.
        offset: usize,
        /// Processed text surrounding the marker.
        context: String,
    },

    // -----------------------------------------------------------------------
    // Include resolution
    // -----------------------------------------------------------------------
    /// No search root contains the requested include.
    #[error(
        "Unresolved include '{include}' in '{}' (searched: {})",
        .source_path.display(),
        format_search_roots(.searched)
    )]
    UnresolvedInclude {
        /// Include name as written in the directive.
        include: String,
        /// File containing the include directive.
        source_path: PathBuf,
        /// Search roots tried, in order.
        searched: Vec<PathBuf>,
    },

    // -----------------------------------------------------------------------
    // Source files
    // -----------------------------------------------------------------------
    /// The source extension does not map to a shader stage.
    #[error("Unknown scribe file type for '{}'", .path.display())]
    UnknownStage {
        /// Offending source path.
        path: PathBuf,
    },

    /// A source, include or header file could not be read.
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn format_search_roots(roots: &[PathBuf]) -> String {
    if roots.is_empty() {
        return "<no search roots>".to_string();
    }
    roots
        .iter()
        .map(|r| r.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScribeError>;
