//! # rill — a small pure-expression language
//!
//! rill is a tree-walking interpreter for an expression-oriented language:
//! every construct returns a value, bindings are immutable, functions are
//! first-class closures, and a static checker verifies every expression
//! against a structural subtyping relation with sum types before anything
//! runs.
//!
//! ```text
//! let f = func(n int) int
//!   if n < 2 then n else f(n - 1) + f(n - 2)
//! in [f(x) for x in range(0, 10)]
//! ```
//!
//! ## Pipeline
//!
//! Source lines flow through four phases, each of which aborts the run on
//! its first error:
//!
//! ```text
//! lines → lexer → parser → type checker → evaluator → value
//! ```
//!
//! - [`lexer`]: lines → located tokens
//! - [`parser`]: tokens → expression AST + type syntax
//! - [`typecheck`]: AST → type, under structural subtyping
//! - [`eval`]: AST → runtime value, under immutable environments
//! - [`report`]: renders layered diagnostics with source excerpts
//!
//! ## Quick start
//!
//! ```rust
//! use rill::eval::{standard_env, Value};
//! use rill::source::SourceMap;
//!
//! let mut sources = SourceMap::new();
//! let (env, tenv) = standard_env();
//! let value = rill::run_file(
//!     &mut sources,
//!     "example",
//!     "let x = 1 in x + 2",
//!     &env,
//!     &tenv,
//! )
//! .unwrap();
//! assert_eq!(value, Value::Int(3));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod report;
pub mod source;
pub mod typecheck;
pub mod types;

pub use ast::Expr;
pub use error::{Diagnostic, LexError};
pub use eval::{Environment, Value};
pub use lexer::{Token, TokenCursor, TokenKind};
pub use parser::Parser;
pub use source::{FileId, SourceLoc, SourceMap};
pub use typecheck::TypeEnv;
pub use types::{Primitive, Type};

/// Lexes and parses the lines of a registered file.
pub fn parse_lines(file: FileId, lines: &[String]) -> Result<Expr, Diagnostic> {
    let tokens = lexer::tokenize(file, lines)?;
    Parser::new(tokens).parse_program()
}

/// Runs the full pipeline for one source text.
///
/// The text is registered in `sources` (so errors can be rendered against
/// it), lexed, parsed, type checked, and evaluated under the given
/// environments.
pub fn run_file(
    sources: &mut SourceMap,
    name: &str,
    text: &str,
    env: &Environment,
    tenv: &TypeEnv,
) -> Result<Value, Diagnostic> {
    let file = sources.add_file(name, source::split_lines(text));
    let lines = sources.lines(file).expect("file was just registered");
    let expr = parse_lines(file, lines)?;
    typecheck::check(&expr, tenv)?;
    eval::eval(&expr, env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval::standard_env;

    fn run(src: &str) -> Result<Value, Diagnostic> {
        let mut sources = SourceMap::new();
        let (env, tenv) = standard_env();
        run_file(&mut sources, "test", src, &env, &tenv)
    }

    #[test]
    fn pipeline_runs_end_to_end() {
        assert_eq!(run("let x = 1 in x + 2").unwrap(), Value::Int(3));
    }

    #[test]
    fn pipeline_rejects_ill_typed_programs_before_running() {
        // the program would "work" at runtime; the checker rejects it first
        assert!(run("let x any = 1 in x + 1").is_err());
    }

    #[test]
    fn builtins_are_visible_to_both_phases() {
        assert_eq!(
            run("len(range(0, 4))").unwrap(),
            Value::Int(4)
        );
    }
}
