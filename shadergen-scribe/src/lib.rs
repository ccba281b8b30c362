//! Scribe directive preprocessor for shadergen.
//!
//! Shader sources are written against a small templating dialect (function
//! macros, conditionals, includes and comment blocks delimited by `<@ @>` and
//! `<! !>`). This crate turns that dialect into plain preprocessor text and
//! reports the files a source depends on. It includes:
//!
//! - The directive scanner ([`directive`])
//! - The preprocessing passes and dependency discovery ([`preprocessor`])
//! - Include search path resolution ([`include`])
//! - Stage inference from source extensions ([`stage`])
//! - The standalone `scribe` command line ([`cli`])

pub mod cli;
pub mod deps;
pub mod directive;
pub mod error;
pub mod include;
pub mod preprocessor;
pub mod source;
pub mod stage;

pub use deps::DependencySet;
pub use directive::{Condition, Directive, DirectiveScanner, Marker, scan};
pub use error::{Result, ScribeError};
pub use include::IncludeSearchPath;
pub use preprocessor::{ExpandOptions, Expansion, discover_dependencies, process};
pub use source::SourceUnit;
pub use stage::StageType;
