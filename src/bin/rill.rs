//! rill - run a rill program
//!
//! Reads one source file (or standard input), pipes it through
//! lex → parse → type check → evaluate, and prints the resulting value.
//! Errors print the layered diagnostic trace with source excerpts.
//!
//! # Usage
//!
//! ```bash
//! # run a file
//! rill --input program.rill
//!
//! # read from standard input
//! echo 'let x = 1 in x + 2' | rill
//! ```
//!
//! The working directory is switched to the input file's parent while the
//! program runs, so `import` resolves paths relative to the importing file.

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use colored::Colorize;
use rill::error::Diagnostic;
use rill::eval::{standard_env, Builtin, Environment, Value};
use rill::source::{split_lines, SourceMap};
use rill::typecheck::TypeEnv;
use rill::types::Type;
use std::cell::RefCell;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;

/// Interpreter for the rill expression language
#[derive(ClapParser, Debug)]
#[command(name = "rill")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input file; reads standard input when absent
    #[arg(long)]
    input: Option<String>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let (tag, text) = match args.input.as_deref() {
        None | Some("") => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read standard input")?;
            ("stdin".to_string(), text)
        }
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to open the file at the provided path: {}", path))?;
            (path.to_string(), text)
        }
    };

    // imports resolve relative to the input file
    let restore_dir = std::env::current_dir().ok();
    if let Some(path) = args.input.as_deref().filter(|p| !p.is_empty()) {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::env::set_current_dir(parent)
                    .with_context(|| format!("failed to enter directory of {}", path))?;
            }
        }
    }

    let sources = Rc::new(RefCell::new(SourceMap::new()));
    let (env, tenv) = driver_env(&sources);

    let display_name = Path::new(&tag)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    let tag = display_name.unwrap_or(tag);
    let result = run_pipeline(&sources, &tag, &text, &env, &tenv);

    if let Some(dir) = restore_dir {
        let _ = std::env::set_current_dir(dir);
    }

    match result {
        Ok(value) => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
        Err(diag) => {
            eprintln!("{}", "Error:".red().bold());
            eprint!("{}", rill::report::render(&diag, &sources.borrow()));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// The standard environment plus the driver-supplied `import` builtin.
///
/// `import : (string) any` reads the given path, registers its lines, and
/// re-enters the full pipeline. The environment it evaluates under includes
/// `import` itself, so imported files can import in turn.
fn driver_env(sources: &Rc<RefCell<SourceMap>>) -> (Environment, TypeEnv) {
    let (base_env, mut tenv) = standard_env();
    tenv.bind("import", Type::func([Type::STR], Type::ANY));

    // the import closure needs the finished environment; it is filled in
    // right after the builtin is registered
    let full_env: Rc<RefCell<Option<Environment>>> = Rc::new(RefCell::new(None));

    let import = {
        let sources = Rc::clone(sources);
        let full_env = Rc::clone(&full_env);
        let tenv = tenv.clone();
        Builtin::new("import", vec![Type::STR], Type::ANY, move |args| {
            let path = match &args[0] {
                Value::Str(path) => path.clone(),
                other => {
                    return Err(Diagnostic::new(format!(
                        "expected string; got {}",
                        other.kind()
                    )))
                }
            };
            let text = std::fs::read_to_string(&path)
                .map_err(|e| Diagnostic::new(format!("failed to import '{}': {}", path, e)))?;
            let env = full_env
                .borrow()
                .clone()
                .expect("driver environment is initialized before evaluation");
            run_pipeline(&sources, &path, &text, &env, &tenv)
                .map_err(|e| Diagnostic::new(format!("in import of '{}'", path)).because(e))
        })
    };

    let env = base_env.bind("import", Value::Builtin(Rc::new(import)));
    *full_env.borrow_mut() = Some(env.clone());
    (env, tenv)
}

/// Registers one source text and runs it through the full pipeline.
///
/// The source map is only borrowed while the file is registered, so nested
/// `import` calls can register further files during evaluation.
fn run_pipeline(
    sources: &Rc<RefCell<SourceMap>>,
    name: &str,
    text: &str,
    env: &Environment,
    tenv: &TypeEnv,
) -> Result<Value, Diagnostic> {
    let lines = split_lines(text);
    let file = sources.borrow_mut().add_file(name, lines.clone());
    let expr = rill::parse_lines(file, &lines)?;
    rill::typecheck::check(&expr, tenv)?;
    rill::eval::eval(&expr, env)
}
