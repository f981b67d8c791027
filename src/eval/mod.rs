//! Runtime evaluation.
//!
//! This module holds the runtime half of the interpreter: the value
//! representation and environments ([`value`]), the tree-walking evaluator
//! itself ([`interpreter`]), and the standard builtin library
//! ([`builtins`]).
//!
//! # Example
//!
//! ```rust
//! use rill::eval::{eval, Environment};
//! use rill::eval::value::Value;
//! use rill::lexer::tokenize;
//! use rill::parser::Parser;
//! use rill::source::FileId;
//!
//! let toks = tokenize(FileId::default(), &["1 + 2".to_string()]).unwrap();
//! let expr = Parser::new(toks).parse_program().unwrap();
//! assert_eq!(eval(&expr, &Environment::new()).unwrap(), Value::Int(3));
//! ```

pub mod builtins;
pub mod interpreter;
pub mod value;

pub use builtins::standard_env;
pub use interpreter::{call_value, eval};
pub use value::{Builtin, Closure, Environment, Value};
