//! Directive scanner.
//!
//! Locates scribe directive markers in shader text. A marker is either a
//! directive delimited by `<@` … `@>` or a comment block delimited by
//! `<!` … `!>`. Both may span lines. The grammar recognised here is the
//! one shader authors write, so it is matched literally:
//!
//! ```text
//! <@func NAME ARGS@> ... <@endfunc@>
//! <! comment !>
//! <@if A == B@>  <@if not A@>  <@if A@>
//! <@elif A == B@>  <@elif not A@>  <@elif A@>
//! <@else@>  <@endif@>
//! <@def NAME@>
//! <@include NAME@>
//! ```
//!
//! The scanner never fails. A marker whose body matches none of the forms is
//! reported as [`Directive::Unknown`] and an opening delimiter with no closing
//! delimiter is skipped; both are left in the text for the validation pass to
//! reject.

use regex::Regex;
use std::sync::LazyLock;

/// Opening delimiter of a directive.
pub const DIRECTIVE_OPEN: &str = "<@";
/// Closing delimiter of a directive.
pub const DIRECTIVE_CLOSE: &str = "@>";
/// Opening delimiter of a comment block.
pub const COMMENT_OPEN: &str = "<!";
/// Closing delimiter of a comment block.
pub const COMMENT_CLOSE: &str = "!>";

static EQUALITY_CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s*==\s*(\S+)$")
        .expect("equality condition regex is a compile-time constant and must be valid")
});

static NEGATED_CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^not\s+(\S+)$")
        .expect("negated condition regex is a compile-time constant and must be valid")
});

/// Condition of an `if` / `elif` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition<'a> {
    /// `A == B`
    Equals(&'a str, &'a str),
    /// `not A`
    NotDefined(&'a str),
    /// `A`
    Defined(&'a str),
}

impl<'a> Condition<'a> {
    fn parse(expr: &'a str) -> Option<Self> {
        if let Some(caps) = EQUALITY_CONDITION.captures(expr) {
            let lhs = caps.get(1)?.as_str();
            let rhs = caps.get(2)?.as_str();
            return Some(Condition::Equals(lhs, rhs));
        }
        if let Some(caps) = NEGATED_CONDITION.captures(expr) {
            return Some(Condition::NotDefined(caps.get(1)?.as_str()));
        }
        is_single_token(expr).then_some(Condition::Defined(expr))
    }

    /// Native preprocessor expression for this condition.
    pub fn to_native(self) -> String {
        match self {
            Condition::Equals(lhs, rhs) => format!("({lhs} == {rhs})"),
            Condition::NotDefined(name) => format!("!defined({name})"),
            Condition::Defined(name) => format!("defined({name})"),
        }
    }
}

/// A recognised directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `<@func NAME ARGS@>`; `header` is the raw `NAME ARGS` text.
    FunctionBegin {
        name: &'a str,
        args: &'a str,
        header: &'a str,
    },
    /// `<@endfunc@>`
    FunctionEnd,
    If(Condition<'a>),
    ElseIf(Condition<'a>),
    Else,
    EndIf,
    /// `<@def NAME@>`
    Define(&'a str),
    /// `<@include NAME@>`
    Include(&'a str),
    /// `<! ... !>`
    CommentBlock,
    /// A `<@ ... @>` marker matching no known form; holds the raw body.
    Unknown(&'a str),
}

impl<'a> Directive<'a> {
    /// Parse the text between `<@` and `@>`.
    pub fn parse(body: &'a str) -> Self {
        let trimmed = body.trim();
        let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (trimmed, ""),
        };

        match keyword {
            "func" if !rest.is_empty() => {
                let split = rest
                    .find(|c: char| c == '(' || c.is_whitespace())
                    .unwrap_or(rest.len());
                Directive::FunctionBegin {
                    name: &rest[..split],
                    args: rest[split..].trim(),
                    header: rest,
                }
            }
            "endfunc" if rest.is_empty() => Directive::FunctionEnd,
            "if" => Condition::parse(rest).map_or(Directive::Unknown(body), Directive::If),
            "elif" => Condition::parse(rest).map_or(Directive::Unknown(body), Directive::ElseIf),
            "else" if rest.is_empty() => Directive::Else,
            "endif" if rest.is_empty() => Directive::EndIf,
            "def" if is_single_token(rest) => Directive::Define(rest),
            "include" if is_single_token(rest) => Directive::Include(rest),
            _ => Directive::Unknown(body),
        }
    }
}

fn is_single_token(text: &str) -> bool {
    !text.is_empty() && !text.contains(char::is_whitespace)
}

/// A located marker: byte range in the scanned text plus its directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker<'a> {
    /// Byte offset of the opening delimiter.
    pub start: usize,
    /// Byte offset one past the closing delimiter.
    pub end: usize,
    pub directive: Directive<'a>,
}

impl Marker<'_> {
    /// Full marker text, delimiters included.
    pub fn text<'t>(&self, source: &'t str) -> &'t str {
        &source[self.start..self.end]
    }
}

/// Iterator over the markers of a text, in order of appearance.
#[derive(Debug, Clone)]
pub struct DirectiveScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> DirectiveScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl<'a> Iterator for DirectiveScanner<'a> {
    type Item = Marker<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        while let Some(rel) = self.text[self.pos..].find('<') {
            let start = self.pos + rel;
            let close = match bytes.get(start + 1) {
                Some(b'@') => DIRECTIVE_CLOSE,
                Some(b'!') => COMMENT_CLOSE,
                _ => {
                    self.pos = start + 1;
                    continue;
                }
            };

            let body_start = start + 2;
            let Some(len) = self.text[body_start..].find(close) else {
                log::trace!("Unterminated marker at byte {start}");
                self.pos = body_start;
                continue;
            };

            let end = body_start + len + close.len();
            self.pos = end;
            let directive = if close == COMMENT_CLOSE {
                Directive::CommentBlock
            } else {
                Directive::parse(&self.text[body_start..body_start + len])
            };
            return Some(Marker {
                start,
                end,
                directive,
            });
        }

        self.pos = self.text.len();
        None
    }
}

/// Scan `text` for directive markers.
pub fn scan(text: &str) -> DirectiveScanner<'_> {
    DirectiveScanner::new(text)
}

/// Byte offset of the first `<@` or `<!` sequence, terminated or not.
pub fn find_leftover_marker(text: &str) -> Option<usize> {
    match (text.find(DIRECTIVE_OPEN), text.find(COMMENT_OPEN)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
