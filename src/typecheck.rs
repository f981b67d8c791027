//! The static type checker.
//!
//! Every expression is assigned a type against a [`TypeEnv`], or rejected
//! with a located [`Diagnostic`]. Checking is local: types flow bottom-up,
//! annotations constrain top-down, and nothing is inferred across bindings
//! beyond the sequential visibility of `let`.
//!
//! Two rules do the heavy lifting for functions:
//!
//! - A `let` binding whose expression is a `func` literal is *pre-bound*
//!   with its declared signature before the function body is checked, which
//!   is what makes direct recursion typecheck.
//! - A `func` node's own result type carries the *inferred* body type, not
//!   the declared return type, so callers see the tighter result. The
//!   declared type still bounds the body (`declared ≽ inferred`).
//!
//! # Example
//!
//! ```rust
//! use rill::lexer::tokenize;
//! use rill::parser::Parser;
//! use rill::source::FileId;
//! use rill::typecheck::{check, TypeEnv};
//! use rill::types::Type;
//!
//! let toks = tokenize(FileId::default(), &["let x = 1 in x + 2".to_string()]).unwrap();
//! let expr = Parser::new(toks).parse_program().unwrap();
//! let ty = check(&expr, &TypeEnv::new()).unwrap();
//! assert_eq!(ty, Type::INT);
//! ```

use crate::ast::{Binding, Expr, Literal, MatchArm, Param};
use crate::error::Diagnostic;
use crate::types::Type;
use std::collections::HashMap;

/// The type environment: identifier → type, with lexical scoping.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    bindings: HashMap<String, Type>,
    parent: Option<Box<TypeEnv>>,
}

impl TypeEnv {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a child scope with this environment as parent.
    pub fn child(&self) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// Binds a name in the current scope, shadowing outer bindings.
    pub fn bind(&mut self, name: impl Into<String>, ty: Type) {
        self.bindings.insert(name.into(), ty);
    }

    /// Looks a name up, walking outward through parent scopes.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.bindings
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|p| p.lookup(name)))
    }
}

/// Computes the type of an expression, or rejects it.
pub fn check(expr: &Expr, env: &TypeEnv) -> Result<Type, Diagnostic> {
    match expr {
        Expr::Literal { value, .. } => Ok(match value {
            Literal::Int(_) => Type::INT,
            Literal::Str(_) => Type::STR,
            Literal::Bool(_) => Type::BOOL,
        }),

        Expr::Identifier { name, loc } => env
            .lookup(name)
            .cloned()
            .ok_or_else(|| Diagnostic::at(format!("unbound identifier '{}'", name), *loc)),

        Expr::ArrayLiteral {
            elems, elem_type, ..
        } => {
            let declared = elem_type.clone().unwrap_or(Type::ANY);
            for elem in elems {
                let t = check(elem, env)?;
                if !declared.is_supertype_of(&t) {
                    return Err(Diagnostic::at(
                        format!("expected element of type {}; got {}", declared, t),
                        elem.loc(),
                    ));
                }
            }
            Ok(Type::list(declared))
        }

        Expr::ObjectLiteral { fields, .. } => {
            let mut field_types = std::collections::BTreeMap::new();
            for (name, field_expr) in fields {
                // later fields may refer to the partial object through `this`
                let mut scope = env.child();
                scope.bind("this", Type::Object(field_types.clone()));
                let t = check(field_expr, &scope)?;
                field_types.insert(name.clone(), t);
            }
            Ok(Type::Object(field_types))
        }

        Expr::Let {
            bindings,
            body,
            loc,
        } => {
            let mut scope = env.child();
            for binding in bindings {
                check_binding(binding, &mut scope)
                    .map_err(|e| e.context("in let clause", *loc))?;
            }
            check(body, &scope)
        }

        Expr::If {
            cond, then, els, ..
        } => {
            let cond_ty = check(cond, env)?;
            if cond_ty != Type::BOOL {
                return Err(Diagnostic::at(
                    format!("if condition must evaluate to a boolean; got {}", cond_ty),
                    cond.loc(),
                ));
            }
            let then_ty = check(then, env)?;
            let else_ty = check(els, env)?;
            Ok(Type::sum([then_ty, else_ty]))
        }

        Expr::For {
            body, var, iter, ..
        } => {
            let elem_ty = match check(iter, env)? {
                Type::List(elem) => *elem,
                other => {
                    return Err(Diagnostic::at(
                        format!("for expression must iterate over a list; got {}", other),
                        iter.loc(),
                    ))
                }
            };
            let mut scope = env.child();
            scope.bind(var.clone(), elem_ty);
            let body_ty = check(body, &scope)?;
            Ok(Type::list(body_ty))
        }

        Expr::Func {
            params, ret, body, ..
        } => {
            let mut scope = env.child();
            for param in params {
                scope.bind(param.name.clone(), param.ty.clone());
            }
            let body_ty = check(body, &scope)?;
            if !ret.is_supertype_of(&body_ty) {
                return Err(Diagnostic::at(
                    format!(
                        "function body does not satisfy declared return type: expected {}; got {}",
                        ret, body_ty
                    ),
                    body.loc(),
                ));
            }
            // expose the inferred body type; the declaration only bounds it
            Ok(Type::func(params.iter().map(|p| p.ty.clone()), body_ty))
        }

        Expr::Call {
            callee, args, loc, ..
        } => {
            let callee_ty = check(callee, env)?;
            let (formals, ret) = match callee_ty {
                Type::Func { args, ret } => (args, ret),
                other => {
                    return Err(Diagnostic::at(
                        format!("expected function; got {}", other),
                        callee.loc(),
                    ))
                }
            };
            if formals.len() != args.len() {
                return Err(Diagnostic::at(
                    format!("expected {} arguments, got {}", formals.len(), args.len()),
                    *loc,
                ));
            }
            for (formal, arg) in formals.iter().zip(args.iter()) {
                let arg_ty = check(arg, env)?;
                if !formal.is_supertype_of(&arg_ty) {
                    return Err(Diagnostic::at(
                        format!("expected argument of type {}; got {}", formal, arg_ty),
                        arg.loc(),
                    ));
                }
            }
            Ok(*ret)
        }

        Expr::Index { array, index, .. } => {
            let elem_ty = expect_list(array, env)?;
            expect_int_operand(index, env)?;
            Ok(elem_ty)
        }

        Expr::Slice {
            array, begin, end, ..
        } => {
            let elem_ty = expect_list(array, env)?;
            if let Some(begin) = begin {
                expect_int_operand(begin, env)?;
            }
            if let Some(end) = end {
                expect_int_operand(end, env)?;
            }
            Ok(Type::list(elem_ty))
        }

        Expr::FieldAccess {
            object, field, loc, ..
        } => {
            let obj_ty = check(object, env)?;
            match obj_ty {
                Type::Object(fields) => fields.get(field).cloned().ok_or_else(|| {
                    Diagnostic::at(
                        format!("no field '{}' on type {}", field, Type::Object(fields.clone())),
                        *loc,
                    )
                }),
                other => Err(Diagnostic::at(
                    format!("expected object; got {}", other),
                    object.loc(),
                )),
            }
        }

        Expr::Not { expr, .. } => {
            expect_bool_operand(expr, env)?;
            Ok(Type::BOOL)
        }

        Expr::And { left, right, .. } | Expr::Or { left, right, .. } => {
            expect_bool_operand(left, env)?;
            expect_bool_operand(right, env)?;
            Ok(Type::BOOL)
        }

        Expr::Eq { left, right, .. } => {
            check(left, env)?;
            check(right, env)?;
            Ok(Type::BOOL)
        }

        Expr::Cmp {
            left, op, right, ..
        } => {
            expect_int_for_op(left, &op.to_string(), env)?;
            expect_int_for_op(right, &op.to_string(), env)?;
            Ok(Type::BOOL)
        }

        Expr::Add {
            left, op, right, ..
        } => {
            expect_int_for_op(left, &op.to_string(), env)?;
            expect_int_for_op(right, &op.to_string(), env)?;
            Ok(Type::INT)
        }

        Expr::Mul {
            left, op, right, ..
        } => {
            expect_int_for_op(left, &op.to_string(), env)?;
            expect_int_for_op(right, &op.to_string(), env)?;
            Ok(Type::INT)
        }

        Expr::As { expr, ty, loc } => {
            let inner_ty = check(expr, env)?;
            if !inner_ty.is_supertype_of(ty) {
                return Err(Diagnostic::at(
                    format!(
                        "expression of type {} can never be of asserted type {}",
                        inner_ty, ty
                    ),
                    expr.loc(),
                )
                .context("in \"as\" expression", *loc));
            }
            Ok(ty.clone())
        }

        Expr::Match {
            scrutinee,
            binding,
            arms,
            ..
        } => {
            check(scrutinee, env)?;
            let mut arm_types = Vec::with_capacity(arms.len());
            for MatchArm { ty, expr } in arms {
                let mut scope = env.child();
                scope.bind(binding.clone(), ty.clone());
                arm_types.push(check(expr, &scope)?);
            }
            Ok(Type::sum(arm_types))
        }
    }
}

/// Checks one let binding and extends the scope with it.
///
/// A `func`-literal binding is pre-bound with its declared signature so the
/// body can call itself.
fn check_binding(binding: &Binding, scope: &mut TypeEnv) -> Result<(), Diagnostic> {
    if let Expr::Func { params, ret, .. } = &binding.expr {
        scope.bind(binding.name.clone(), declared_signature(params, ret));
    }

    let inferred = check(&binding.expr, scope)?;
    let bound = match &binding.ty {
        Some(expected) => {
            if !expected.is_supertype_of(&inferred) {
                return Err(Diagnostic::at(
                    format!("unmet type constraint: expected {}; got {}", expected, inferred),
                    binding.expr.loc(),
                ));
            }
            expected.clone()
        }
        None => inferred,
    };
    scope.bind(binding.name.clone(), bound);
    Ok(())
}

/// The signature a `func` literal declares, before its body is inspected.
fn declared_signature(params: &[Param], ret: &Type) -> Type {
    Type::func(params.iter().map(|p| p.ty.clone()), ret.clone())
}

fn expect_list(expr: &Expr, env: &TypeEnv) -> Result<Type, Diagnostic> {
    match check(expr, env)? {
        Type::List(elem) => Ok(*elem),
        other => Err(Diagnostic::at(
            format!("expected list; got {}", other),
            expr.loc(),
        )),
    }
}

fn expect_int_operand(expr: &Expr, env: &TypeEnv) -> Result<(), Diagnostic> {
    match check(expr, env)? {
        Type::Primitive(crate::types::Primitive::Int) => Ok(()),
        other => Err(Diagnostic::at(
            format!("expected int; got {}", other),
            expr.loc(),
        )),
    }
}

fn expect_bool_operand(expr: &Expr, env: &TypeEnv) -> Result<(), Diagnostic> {
    match check(expr, env)? {
        Type::Primitive(crate::types::Primitive::Bool) => Ok(()),
        other => Err(Diagnostic::at(
            format!("expected bool; got {}", other),
            expr.loc(),
        )),
    }
}

fn expect_int_for_op(expr: &Expr, op: &str, env: &TypeEnv) -> Result<(), Diagnostic> {
    let ty = check(expr, env)?;
    if ty != Type::INT {
        return Err(Diagnostic::at(
            format!("operator '{}' cannot be applied to type {}", op, ty),
            expr.loc(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use crate::source::FileId;
    use pretty_assertions::assert_eq;

    fn typecheck(src: &str) -> Result<Type, Diagnostic> {
        let lines: Vec<String> = src.lines().map(|l| l.to_string()).collect();
        let toks = tokenize(FileId::default(), &lines).map_err(Diagnostic::from)?;
        let expr = Parser::new(toks).parse_program()?;
        check(&expr, &TypeEnv::new())
    }

    #[test]
    fn literals() {
        assert_eq!(typecheck("1").unwrap(), Type::INT);
        assert_eq!(typecheck("\"x\"").unwrap(), Type::STR);
        assert_eq!(typecheck("true").unwrap(), Type::BOOL);
    }

    #[test]
    fn let_binds_sequentially() {
        assert_eq!(typecheck("let a = 1, b = a + 1 in b").unwrap(), Type::INT);
        assert!(typecheck("let a = b, b = 1 in a").is_err());
    }

    #[test]
    fn let_annotation_widens_binding() {
        // x is visible at its annotated type, not the inferred one
        assert_eq!(
            typecheck("let x any = 1 in x").unwrap(),
            Type::ANY
        );
        assert!(typecheck("let x int = \"s\" in x").is_err());
    }

    #[test]
    fn if_sums_branches() {
        assert_eq!(
            typecheck("if true then 1 else \"s\"").unwrap(),
            Type::sum([Type::INT, Type::STR])
        );
        assert_eq!(typecheck("if true then 1 else 2").unwrap(), Type::INT);
        assert!(typecheck("if 1 then 2 else 3").is_err());
    }

    #[test]
    fn recursion_types_through_prebinding() {
        let src = "let f = func(n int) int if n < 2 then n else f(n - 1) + f(n - 2) in f(10)";
        assert_eq!(typecheck(src).unwrap(), Type::INT);
    }

    #[test]
    fn func_exposes_inferred_return_type() {
        // declared any, body int: callers see int
        assert_eq!(
            typecheck("let f = func(n int) n + 1 in f(1)").unwrap(),
            Type::INT
        );
    }

    #[test]
    fn declared_return_bounds_body() {
        assert!(typecheck("func(n int) int \"s\"").is_err());
    }

    #[test]
    fn call_checks_arity_and_argument_types() {
        let add = "let add = func(a int, b int) int a + b in ";
        assert_eq!(typecheck(&format!("{}add(2, 3)", add)).unwrap(), Type::INT);

        let err = typecheck(&format!("{}add(2, \"hi\")", add)).unwrap_err();
        let root = err.root_cause();
        assert!(root.message.contains("expected argument of type int"));
        // location points at the string argument
        assert_eq!(root.location.unwrap().column, 49);

        assert!(typecheck(&format!("{}add(2)", add)).is_err());
    }

    #[test]
    fn calling_a_non_function_fails() {
        assert!(typecheck("let x = 1 in x(2)").is_err());
    }

    #[test]
    fn comprehension_types() {
        assert_eq!(
            typecheck("let xs = [1, 2, 3] in [x * x for x in xs]").unwrap(),
            Type::list(Type::INT)
        );
        assert!(typecheck("[x for x in 5]").is_err());
    }

    #[test]
    fn index_and_slice_types() {
        assert_eq!(typecheck("[1, 2][0]").unwrap(), Type::ANY);
        assert_eq!(typecheck("[1, 2] int [0]").unwrap(), Type::INT);
        assert_eq!(
            typecheck("let xs = [1] int in xs[0:1]").unwrap(),
            Type::list(Type::INT)
        );
        assert!(typecheck("[1][\"a\"]").is_err());
        assert!(typecheck("5[0]").is_err());
    }

    #[test]
    fn object_field_types() {
        assert_eq!(
            typecheck("let p = {name: \"a\", n: 2} in p.n").unwrap(),
            Type::INT
        );
        assert!(typecheck("let p = {n: 2} in p.q").is_err());
    }

    #[test]
    fn this_sees_earlier_fields() {
        assert_eq!(
            typecheck("{a: 1, b: this.a + 1}.b").unwrap(),
            Type::INT
        );
    }

    #[test]
    fn boolean_operators_require_bools() {
        assert_eq!(typecheck("true and not false or true").unwrap(), Type::BOOL);
        assert!(typecheck("1 and true").is_err());
        assert!(typecheck("not 1").is_err());
    }

    #[test]
    fn equality_takes_any_operands() {
        assert_eq!(typecheck("1 is \"a\"").unwrap(), Type::BOOL);
        assert_eq!(typecheck("[1] is not [2]").unwrap(), Type::BOOL);
    }

    #[test]
    fn arithmetic_requires_ints() {
        assert_eq!(typecheck("1 + 2 * 3 % 4").unwrap(), Type::INT);
        assert_eq!(typecheck("1 < 2").unwrap(), Type::BOOL);
        let err = typecheck("\"a\" + 1").unwrap_err();
        assert!(err
            .root_cause()
            .message
            .contains("operator '+' cannot be applied to type string"));
    }

    #[test]
    fn cast_requires_loose_inner_type() {
        assert_eq!(typecheck("let x any = 1 in x as int").unwrap(), Type::INT);
        // int can never be a string
        assert!(typecheck("1 as string").is_err());
    }

    #[test]
    fn match_sums_arm_types() {
        let src = "let f = func(x any) match v on x case int v case string v in f(1)";
        assert_eq!(
            typecheck(src).unwrap(),
            Type::sum([Type::INT, Type::STR])
        );
    }

    #[test]
    fn match_arm_binding_is_narrowed() {
        // inside the int arm, v is an int and may be added
        let src = "let f = func(x any) int match v on x case int v + 1 case string 0 in f(1)";
        assert_eq!(typecheck(src).unwrap(), Type::INT);
    }
}
