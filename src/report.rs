//! Diagnostic rendering.
//!
//! Renders a [`Diagnostic`] chain against the [`SourceMap`]: the root cause
//! comes first, each enclosing context after it, and every located level
//! quotes its source line with a caret under the offending column.
//!
//! ```text
//! division by zero
//! let f = func(n int) int n / 0 in f(1)
//!                             ^-here
//! in call to f
//! let f = func(n int) int n / 0 in f(1)
//!                                  ^-here
//! ```

use crate::error::Diagnostic;
use crate::source::SourceMap;

/// Renders a diagnostic chain, innermost cause first.
pub fn render(diag: &Diagnostic, sources: &SourceMap) -> String {
    let mut out = String::new();
    let levels: Vec<&Diagnostic> = diag.chain().collect();
    for level in levels.into_iter().rev() {
        out.push_str(&level.message);
        out.push('\n');
        if let Some(loc) = level.location {
            if let Some(line) = sources.line(loc.file, loc.line) {
                out.push_str(line);
                out.push('\n');
                out.push_str(&" ".repeat(loc.column));
                out.push_str("^-here\n");
            }
        }
    }
    out
}
