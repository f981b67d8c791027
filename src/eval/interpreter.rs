//! The tree-walking evaluator.
//!
//! Evaluation is strict and left-to-right everywhere: operands, call
//! arguments, list elements, object fields, comprehension iterations. The
//! only laziness in the language is `and`/`or` short-circuiting and `if`
//! evaluating a single branch.
//!
//! Every runtime failure aborts the whole evaluation; nothing is caught.
//! Errors escaping a call are wrapped in an `in call to …` context carrying
//! the call site, so the reported trace reads from the failing operation
//! outward through the call chain.

use crate::ast::{AddOp, CmpOp, EqOp, Expr, Literal, MulOp};
use crate::error::Diagnostic;
use crate::eval::value::{Closure, Environment, Value};
use crate::source::SourceLoc;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Evaluates an expression under an environment.
pub fn eval(expr: &Expr, env: &Environment) -> Result<Value, Diagnostic> {
    match expr {
        Expr::Literal { value, .. } => Ok(match value {
            Literal::Int(n) => Value::Int(*n),
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::Bool(b) => Value::Bool(*b),
        }),

        Expr::Identifier { name, loc } => env
            .lookup(name)
            .cloned()
            .ok_or_else(|| Diagnostic::at(format!("unbound identifier '{}'", name), *loc)),

        Expr::ArrayLiteral { elems, .. } => {
            let mut items = Vec::with_capacity(elems.len());
            for elem in elems {
                items.push(eval(elem, env)?);
            }
            Ok(Value::List(items))
        }

        Expr::ObjectLiteral { fields, .. } => {
            let mut object = BTreeMap::new();
            for (name, field_expr) in fields {
                // later fields see the partial object as `this`
                let scope = env.bind("this", Value::Object(object.clone()));
                let value = eval(field_expr, &scope)?;
                object.insert(name.clone(), value);
            }
            Ok(Value::Object(object))
        }

        Expr::Let { bindings, body, .. } => {
            let mut scope = env.clone();
            for binding in bindings {
                let value = eval(&binding.expr, &scope)?;
                if let Value::Closure(closure) = &value {
                    // the one-shot self-binding patch: write the closure
                    // into its own captured environment under this name
                    let patched = closure
                        .env
                        .borrow()
                        .bind(binding.name.clone(), value.clone());
                    *closure.env.borrow_mut() = patched;
                }
                scope = scope.bind(binding.name.clone(), value);
            }
            eval(body, &scope)
        }

        Expr::If {
            cond, then, els, ..
        } => {
            let cond_val = eval(cond, env)?;
            match cond_val {
                Value::Bool(true) => eval(then, env),
                Value::Bool(false) => eval(els, env),
                other => Err(Diagnostic::at(
                    format!(
                        "if condition must evaluate to a boolean; got {}",
                        other
                    ),
                    cond.loc(),
                )),
            }
        }

        Expr::For {
            body, var, iter, ..
        } => {
            let items = match eval(iter, env)? {
                Value::List(items) => items,
                other => {
                    return Err(Diagnostic::at(
                        format!("for expression must evaluate to a list; got {}", other),
                        iter.loc(),
                    ))
                }
            };
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                let scope = env.bind(var.clone(), item);
                results.push(eval(body, &scope)?);
            }
            Ok(Value::List(results))
        }

        Expr::Func {
            params, ret, body, ..
        } => Ok(Value::Closure(Rc::new(Closure {
            params: params.clone(),
            ret: ret.clone(),
            body: Rc::clone(body),
            env: RefCell::new(env.clone()),
        }))),

        Expr::Call {
            callee, args, loc, ..
        } => {
            let callee_val = eval(callee, env)?;
            let mut arg_vals = Vec::with_capacity(args.len());
            for arg in args {
                arg_vals.push(eval(arg, env)?);
            }
            let context = match callee.as_ref() {
                Expr::Identifier { name, .. } => format!("in call to {}", name),
                _ => "in call to anonymous function".to_string(),
            };
            call_value(&callee_val, arg_vals, callee.loc())
                .map_err(|e| e.context(context, *loc))
        }

        Expr::Index { array, index, .. } => {
            let items = expect_list(eval(array, env)?, array.loc())?;
            let i = expect_int(eval(index, env)?, index.loc())?;
            if i < 0 || i as usize >= items.len() {
                return Err(Diagnostic::at(
                    format!("index out of bounds ({})", i),
                    index.loc(),
                ));
            }
            Ok(items[i as usize].clone())
        }

        Expr::Slice {
            array,
            begin,
            end,
            loc,
        } => {
            let items = expect_list(eval(array, env)?, array.loc())?;
            let len = items.len() as i64;

            let mut begin_val = 0;
            let mut begin_loc = *loc;
            if let Some(begin) = begin {
                begin_val = expect_int(eval(begin, env)?, begin.loc())?;
                begin_loc = begin.loc();
            }
            let mut end_val = len;
            let mut end_loc = *loc;
            if let Some(end) = end {
                end_val = expect_int(eval(end, env)?, end.loc())?;
                end_loc = end.loc();
            }

            // negative bounds count from one past the end
            if begin_val < 0 {
                begin_val = len + begin_val + 1;
            }
            if end_val < 0 {
                end_val = len + end_val + 1;
            }

            if begin_val < 0 || begin_val > len {
                return Err(Diagnostic::at(
                    format!("begin index out of bounds ({})", begin_val),
                    begin_loc,
                ));
            }
            if end_val < 0 || end_val > len {
                return Err(Diagnostic::at(
                    format!("end index out of bounds ({})", end_val),
                    end_loc,
                ));
            }
            if begin_val > end_val {
                return Err(Diagnostic::at(
                    format!(
                        "begin index {} greater than end index {}",
                        begin_val, end_val
                    ),
                    *loc,
                ));
            }

            Ok(Value::List(
                items[begin_val as usize..end_val as usize].to_vec(),
            ))
        }

        Expr::FieldAccess {
            object, field, loc, ..
        } => {
            let obj = eval(object, env)?;
            match obj {
                Value::Object(fields) => fields
                    .get(field)
                    .cloned()
                    .ok_or_else(|| Diagnostic::at(format!("field '{}' not found", field), *loc)),
                other => Err(Diagnostic::at(
                    format!("expected object; got {}", other),
                    object.loc(),
                )),
            }
        }

        Expr::Not { expr, .. } => {
            let v = expect_bool(eval(expr, env)?, expr.loc())?;
            Ok(Value::Bool(!v))
        }

        Expr::And { left, right, .. } => {
            if !expect_bool(eval(left, env)?, left.loc())? {
                return Ok(Value::Bool(false));
            }
            let r = expect_bool(eval(right, env)?, right.loc())?;
            Ok(Value::Bool(r))
        }

        Expr::Or { left, right, .. } => {
            if expect_bool(eval(left, env)?, left.loc())? {
                return Ok(Value::Bool(true));
            }
            let r = expect_bool(eval(right, env)?, right.loc())?;
            Ok(Value::Bool(r))
        }

        Expr::Eq {
            left, op, right, ..
        } => {
            let l = eval(left, env)?;
            let r = eval(right, env)?;
            Ok(Value::Bool(match op {
                EqOp::Eq => l == r,
                EqOp::Ne => l != r,
            }))
        }

        Expr::Cmp {
            left, op, right, ..
        } => {
            let l = expect_int(eval(left, env)?, left.loc())?;
            let r = expect_int(eval(right, env)?, right.loc())?;
            Ok(Value::Bool(match op {
                CmpOp::Lt => l < r,
                CmpOp::Le => l <= r,
                CmpOp::Gt => l > r,
                CmpOp::Ge => l >= r,
            }))
        }

        Expr::Add {
            left, op, right, ..
        } => {
            let l = expect_int(eval(left, env)?, left.loc())?;
            let r = expect_int(eval(right, env)?, right.loc())?;
            Ok(Value::Int(match op {
                AddOp::Add => l.wrapping_add(r),
                AddOp::Sub => l.wrapping_sub(r),
            }))
        }

        Expr::Mul {
            left, op, right, ..
        } => {
            let l = expect_int(eval(left, env)?, left.loc())?;
            let r = expect_int(eval(right, env)?, right.loc())?;
            match op {
                MulOp::Mul => Ok(Value::Int(l.wrapping_mul(r))),
                MulOp::Div => {
                    if r == 0 {
                        Err(Diagnostic::at("division by zero", right.loc()))
                    } else {
                        Ok(Value::Int(l.wrapping_div(r)))
                    }
                }
                MulOp::Rem => {
                    if r == 0 {
                        Err(Diagnostic::at("division by zero", right.loc()))
                    } else {
                        Ok(Value::Int(l.wrapping_rem(r)))
                    }
                }
            }
        }

        Expr::As { expr, ty, loc } => {
            let value = eval(expr, env)?;
            let actual = value.type_of();
            if !ty.is_supertype_of(&actual) {
                return Err(Diagnostic::at(
                    format!("{} is not of assumed type {}", value, ty),
                    expr.loc(),
                )
                .context("in \"as\" expression", *loc));
            }
            Ok(value)
        }

        Expr::Match {
            scrutinee,
            binding,
            arms,
            loc,
        } => {
            let value = eval(scrutinee, env)?;
            let actual = value.type_of();
            for arm in arms {
                if arm.ty.is_supertype_of(&actual) {
                    let scope = env.bind(binding.clone(), value);
                    return eval(&arm.expr, &scope);
                }
            }
            Err(Diagnostic::at("no match arm found", *loc))
        }
    }
}

/// Dispatches a call to a closure or builtin.
pub fn call_value(
    callee: &Value,
    args: Vec<Value>,
    loc: SourceLoc,
) -> Result<Value, Diagnostic> {
    match callee {
        Value::Closure(closure) => {
            if args.len() != closure.params.len() {
                return Err(Diagnostic::at(
                    format!(
                        "expected {} arguments, got {}",
                        closure.params.len(),
                        args.len()
                    ),
                    loc,
                ));
            }
            let captured = closure.env.borrow().clone();
            let scope = captured.bind_all(
                closure
                    .params
                    .iter()
                    .map(|p| p.name.clone())
                    .zip(args),
            );
            eval(&closure.body, &scope)
        }
        Value::Builtin(builtin) => builtin.invoke(args),
        other => Err(Diagnostic::at(
            format!("expected function; got {}", other),
            loc,
        )),
    }
}

fn expect_list(value: Value, loc: SourceLoc) -> Result<Vec<Value>, Diagnostic> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(Diagnostic::at(
            format!("expected list; got {}", other),
            loc,
        )),
    }
}

fn expect_int(value: Value, loc: SourceLoc) -> Result<i64, Diagnostic> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(Diagnostic::at(format!("expected int; got {}", other), loc)),
    }
}

fn expect_bool(value: Value, loc: SourceLoc) -> Result<bool, Diagnostic> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(Diagnostic::at(
            format!("expected bool; got {}", other),
            loc,
        )),
    }
}
