//! Error types for the rill pipeline.
//!
//! Two layers live here:
//!
//! - [`LexError`]: the closed set of tokenization failures, with locations.
//! - [`Diagnostic`]: the error currency of everything after the lexer. A
//!   diagnostic is a message, an optional [`SourceLoc`], and an optional
//!   boxed cause, forming a singly linked chain. Each phase wraps the errors
//!   of the phase below it in its own context ("in let clause", "to
//!   terminate array literal", …) so the reporter can print a layered trace.
//!
//! # Example
//!
//! ```rust
//! use rill::error::Diagnostic;
//! use rill::source::{FileId, SourceLoc};
//!
//! let loc = SourceLoc::new(FileId::default(), 2, 7);
//! let inner = Diagnostic::at("unexpected token", loc);
//! let outer = Diagnostic::at("in let clause", loc).because(inner);
//!
//! assert_eq!(outer.chain().count(), 2);
//! ```

use crate::source::SourceLoc;
use thiserror::Error;

/// Errors produced during tokenization.
///
/// Lex errors abort the whole pipeline; each carries the location of the
/// offending character.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A character outside the language's alphabet, or an alphanumeric
    /// character touching a number literal.
    #[error("unexpected character '{ch}'")]
    UnexpectedChar {
        /// The unexpected character.
        ch: char,
        /// Where it was found.
        loc: SourceLoc,
    },

    /// A string literal with no closing quote before the end of the line.
    #[error("unterminated string")]
    UnterminatedString {
        /// Location of the opening quote.
        loc: SourceLoc,
    },

    /// A backslash escape other than `\n`, `\t`, `\r`, `\\`, `\"`.
    #[error("unexpected escape character '{ch}'")]
    InvalidEscape {
        /// The character after the backslash.
        ch: char,
        /// Location of the escape.
        loc: SourceLoc,
    },
}

impl LexError {
    /// Returns the location of the error.
    pub fn loc(&self) -> SourceLoc {
        match self {
            LexError::UnexpectedChar { loc, .. } => *loc,
            LexError::UnterminatedString { loc } => *loc,
            LexError::InvalidEscape { loc, .. } => *loc,
        }
    }
}

/// A layered interpreter error.
///
/// Diagnostics chain through `cause`: the outermost diagnostic describes the
/// context ("in call to f"), the innermost the root failure ("index out of
/// bounds"). [`Diagnostic::chain`] walks outermost → innermost; the reporter
/// prints the chain innermost-first.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct Diagnostic {
    /// Human-readable description of this level of the failure.
    pub message: String,
    /// Source position this level points at, when one is known.
    pub location: Option<SourceLoc>,
    /// The underlying failure this level wraps, if any.
    pub cause: Option<Box<Diagnostic>>,
}

impl Diagnostic {
    /// Creates a diagnostic with no location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            cause: None,
        }
    }

    /// Creates a diagnostic pointing at a source location.
    pub fn at(message: impl Into<String>, loc: SourceLoc) -> Self {
        Self {
            message: message.into(),
            location: Some(loc),
            cause: None,
        }
    }

    /// Attaches an underlying cause, consuming both.
    pub fn because(mut self, cause: Diagnostic) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Wraps this diagnostic in a new outer context.
    pub fn context(self, message: impl Into<String>, loc: SourceLoc) -> Self {
        Diagnostic::at(message, loc).because(self)
    }

    /// Walks the chain from this (outermost) diagnostic to the root cause.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// The innermost diagnostic in the chain.
    pub fn root_cause(&self) -> &Diagnostic {
        self.chain().last().expect("chain is never empty")
    }
}

impl From<LexError> for Diagnostic {
    fn from(err: LexError) -> Self {
        Diagnostic::at(err.to_string(), err.loc())
    }
}

/// Iterator over a diagnostic's cause chain, outermost first.
pub struct Chain<'a> {
    next: Option<&'a Diagnostic>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Diagnostic;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause.as_deref();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FileId;

    fn loc(line: usize, column: usize) -> SourceLoc {
        SourceLoc::new(FileId::default(), line, column)
    }

    #[test]
    fn lex_error_display() {
        let err = LexError::UnexpectedChar {
            ch: '$',
            loc: loc(2, 5),
        };
        assert_eq!(err.to_string(), "unexpected character '$'");
        assert_eq!(err.loc(), loc(2, 5));
    }

    #[test]
    fn chain_walks_outermost_first() {
        let root = Diagnostic::at("division by zero", loc(4, 10));
        let wrapped = root
            .context("in call to f", loc(1, 0))
            .context("in let clause", loc(0, 0));

        let messages: Vec<_> = wrapped.chain().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["in let clause", "in call to f", "division by zero"]
        );
        assert_eq!(wrapped.root_cause().message, "division by zero");
    }

    #[test]
    fn lex_error_converts_with_location() {
        let err = LexError::UnterminatedString { loc: loc(0, 3) };
        let diag: Diagnostic = err.into();
        assert_eq!(diag.location, Some(loc(0, 3)));
        assert!(diag.cause.is_none());
    }
}
