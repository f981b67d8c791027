//! Source files and source locations.
//!
//! Every token and every AST node carries a [`SourceLoc`]: a file tag plus
//! zero-based line and column indices. The file tag is a [`FileId`], an
//! opaque index into a [`SourceMap`] owned by the driver. The map stores the
//! raw lines of every file fed into the pipeline so the error reporter can
//! quote them back with a caret under the offending column.
//!
//! # Example
//!
//! ```rust
//! use rill::source::{SourceLoc, SourceMap};
//!
//! let mut map = SourceMap::new();
//! let file = map.add_file("example", vec!["let x = 1 in x".to_string()]);
//!
//! let loc = SourceLoc::new(file, 0, 4);
//! assert_eq!(map.line(loc.file, loc.line), Some("let x = 1 in x"));
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque tag identifying a source file inside a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileId(pub(crate) usize);

/// A position inside a source file.
///
/// Both `line` and `column` are zero-based indices into the line table of
/// the file identified by `file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceLoc {
    /// The file this location points into.
    pub file: FileId,
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column index.
    pub column: usize,
}

impl SourceLoc {
    /// Creates a new source location.
    pub fn new(file: FileId, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }
}

impl std::fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

/// The table of source files known to the interpreter.
///
/// The driver registers the main input here and grows the map whenever the
/// `import` builtin loads another file. The core only ever reads it, during
/// error reporting.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

#[derive(Debug, Clone)]
struct SourceFile {
    name: String,
    lines: Vec<String>,
}

impl SourceMap {
    /// Creates an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file and its lines, returning the tag for it.
    pub fn add_file(&mut self, name: impl Into<String>, lines: Vec<String>) -> FileId {
        self.files.push(SourceFile {
            name: name.into(),
            lines,
        });
        FileId(self.files.len() - 1)
    }

    /// Returns the display name of a file.
    pub fn name(&self, file: FileId) -> Option<&str> {
        self.files.get(file.0).map(|f| f.name.as_str())
    }

    /// Returns one line of a file, without its line terminator.
    pub fn line(&self, file: FileId, line: usize) -> Option<&str> {
        self.files
            .get(file.0)
            .and_then(|f| f.lines.get(line))
            .map(|l| l.as_str())
    }

    /// Returns the lines of a file.
    pub fn lines(&self, file: FileId) -> Option<&[String]> {
        self.files.get(file.0).map(|f| f.lines.as_slice())
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no file has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Splits raw source text into the line table the lexer consumes.
///
/// Lines are split on `\n`; a trailing `\r` (CRLF input) is stripped so
/// column indices stay meaningful on all platforms.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(|l| l.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_lookup() {
        let mut map = SourceMap::new();
        let a = map.add_file("a", vec!["one".into(), "two".into()]);
        let b = map.add_file("b", vec!["drei".into()]);

        assert_ne!(a, b);
        assert_eq!(map.name(a), Some("a"));
        assert_eq!(map.line(a, 1), Some("two"));
        assert_eq!(map.line(b, 0), Some("drei"));
        assert_eq!(map.line(b, 1), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn split_handles_crlf() {
        let lines = split_lines("a\r\nb\nc");
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn loc_display_is_one_based() {
        let loc = SourceLoc::new(FileId(0), 0, 4);
        assert_eq!(loc.to_string(), "line 1, column 5");
    }
}
