//! Runtime values and environments.
//!
//! Values are immutable. Lists and objects compare structurally and deeply;
//! function values compare by identity only, so two evaluations of the same
//! `func` expression are never equal.
//!
//! [`Environment`] is a chain of immutable frames behind `Rc`: extending an
//! environment allocates one new frame, and a closure's captured snapshot is
//! a cheap handle clone. The single mutation in the whole interpreter is the
//! closure self-binding patch: every [`Closure`] carries its captured
//! environment in a cell that `let` writes exactly once, at binding time, to
//! make the closure visible to its own body.

use crate::ast::{Expr, Param};
use crate::error::Diagnostic;
use crate::types::Type;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// The absence of a value; result of `print` and `sleep`.
    Unit,
    /// An integer.
    Int(i64),
    /// A string.
    Str(String),
    /// A boolean.
    Bool(bool),
    /// An immutable list.
    List(Vec<Value>),
    /// An immutable record.
    Object(BTreeMap<String, Value>),
    /// A user function with its captured environment.
    Closure(Rc<Closure>),
    /// A host-provided function.
    Builtin(Rc<Builtin>),
}

impl Value {
    /// Reconstructs the runtime type of this value.
    ///
    /// List element types are the normalized sum of the elements' types;
    /// function values report their declared signatures.
    pub fn type_of(&self) -> Type {
        match self {
            Value::Unit => Type::UNIT,
            Value::Int(_) => Type::INT,
            Value::Str(_) => Type::STR,
            Value::Bool(_) => Type::BOOL,
            Value::List(items) => Type::list(Type::sum(items.iter().map(|v| v.type_of()))),
            Value::Object(fields) => Type::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.type_of()))
                    .collect(),
            ),
            Value::Closure(c) => Type::func(c.params.iter().map(|p| p.ty.clone()), c.ret.clone()),
            Value::Builtin(b) => Type::func(b.args.iter().cloned(), b.ret.clone()),
        }
    }

    /// A short name for the value's shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Closure(_) | Value::Builtin(_) => "function",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            // functions are equal only to themselves
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "unit"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Closure(c) => {
                let params: Vec<&str> = c.params.iter().map(|p| p.name.as_str()).collect();
                write!(f, "<func({})>", params.join(", "))
            }
            Value::Builtin(b) => write!(f, "<builtin:{}>", b.name),
        }
    }
}

/// A user function value: parameters, declared return type, shared body
/// AST, and the captured environment cell.
///
/// The cell starts as the environment the `func` expression was evaluated
/// in. When a `let` binds the closure, it writes the cell once more with
/// the closure added under the bound name; after that the cell is never
/// touched again.
#[derive(Debug)]
pub struct Closure {
    /// The declared parameters.
    pub params: Vec<Param>,
    /// The declared return type.
    pub ret: Type,
    /// The body, shared with the AST node that created this closure.
    pub body: Rc<Expr>,
    /// The captured environment.
    pub env: RefCell<Environment>,
}

type BuiltinFn = Box<dyn Fn(Vec<Value>) -> Result<Value, Diagnostic>>;

/// A host-provided function with its declared signature.
///
/// The signature is the single source of truth for the builtin's arity and
/// type contract: the checker reads it through
/// [`Value::type_of`], and [`Builtin::invoke`] enforces the arity at
/// runtime.
pub struct Builtin {
    /// The name the builtin is registered under.
    pub name: String,
    /// Declared argument types.
    pub args: Vec<Type>,
    /// Declared return type.
    pub ret: Type,
    func: BuiltinFn,
}

impl Builtin {
    /// Creates a builtin from its signature and host callable.
    pub fn new(
        name: impl Into<String>,
        args: Vec<Type>,
        ret: Type,
        func: impl Fn(Vec<Value>) -> Result<Value, Diagnostic> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            args,
            ret,
            func: Box::new(func),
        }
    }

    /// Calls the builtin, checking arity and containing host panics.
    ///
    /// A panic inside the host callable is caught at this boundary and
    /// surfaced as an ordinary runtime diagnostic.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, Diagnostic> {
        if args.len() != self.args.len() {
            return Err(Diagnostic::new(format!(
                "expected {} arguments, got {}",
                self.args.len(),
                args.len()
            )));
        }
        match catch_unwind(AssertUnwindSafe(|| (self.func)(args))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(Diagnostic::new(format!(
                    "builtin '{}' failed: {}",
                    self.name, message
                )))
            }
        }
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("ret", &self.ret)
            .finish_non_exhaustive()
    }
}

/// An immutable value environment.
///
/// Environments are parent-pointer chains of frames. [`Environment::bind`]
/// returns a new environment whose frame shadows prior bindings for the
/// same name; the receiver is untouched. Cloning shares the frames.
#[derive(Debug, Clone)]
pub struct Environment {
    frame: Rc<Frame>,
}

#[derive(Debug)]
struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Environment>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self {
            frame: Rc::new(Frame {
                bindings: HashMap::new(),
                parent: None,
            }),
        }
    }

    /// Returns a new environment with one extra binding.
    pub fn bind(&self, name: impl Into<String>, value: Value) -> Environment {
        let mut bindings = HashMap::new();
        bindings.insert(name.into(), value);
        Environment {
            frame: Rc::new(Frame {
                bindings,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Returns a new environment with one frame holding all given bindings.
    pub fn bind_all<I, S>(&self, pairs: I) -> Environment
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Environment {
            frame: Rc::new(Frame {
                bindings: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Looks a name up, innermost frame first.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut env = self;
        loop {
            if let Some(value) = env.frame.bindings.get(name) {
                return Some(value);
            }
            env = env.frame.parent.as_ref()?;
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
