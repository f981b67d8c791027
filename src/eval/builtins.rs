//! The standard builtin library.
//!
//! The driver passes builtins to the interpreter as the initial value
//! environment, with a parallel type environment carrying their signatures.
//! [`standard_env`] builds both for the standard library; drivers add their
//! own entries (notably `import`, which needs file access) on top.
//!
//! Builtins never see source locations; the evaluator wraps their failures
//! in an `in call to …` context at the call site.

use crate::error::Diagnostic;
use crate::eval::value::{Builtin, Environment, Value};
use crate::typecheck::TypeEnv;
use crate::types::Type;
use std::io::BufRead;
use std::rc::Rc;

/// Builds the standard initial value and type environments.
pub fn standard_env() -> (Environment, TypeEnv) {
    let mut env = Environment::new();
    let mut tenv = TypeEnv::new();

    let mut register = |builtin: Builtin| {
        tenv.bind(
            builtin.name.clone(),
            Type::func(builtin.args.iter().cloned(), builtin.ret.clone()),
        );
        env = env.bind(builtin.name.clone(), Value::Builtin(Rc::new(builtin)));
    };

    register(Builtin::new(
        "len",
        vec![Type::list(Type::ANY)],
        Type::INT,
        |args| Ok(Value::Int(want_list(&args[0])?.len() as i64)),
    ));

    register(Builtin::new(
        "range",
        vec![Type::INT, Type::INT],
        Type::list(Type::INT),
        |args| {
            let start = want_int(&args[0])?;
            let end = want_int(&args[1])?;
            Ok(Value::List((start..end).map(Value::Int).collect()))
        },
    ));

    register(Builtin::new(
        "append",
        vec![Type::list(Type::ANY), Type::ANY],
        Type::list(Type::ANY),
        |mut args| {
            let item = args.pop().expect("arity checked");
            let mut items = want_list(&args[0])?.clone();
            items.push(item);
            Ok(Value::List(items))
        },
    ));

    register(Builtin::new(
        "prepend",
        vec![Type::ANY, Type::list(Type::ANY)],
        Type::list(Type::ANY),
        |args| {
            let mut items = vec![args[0].clone()];
            items.extend(want_list(&args[1])?.iter().cloned());
            Ok(Value::List(items))
        },
    ));

    register(Builtin::new(
        "concat",
        vec![Type::list(Type::ANY), Type::list(Type::ANY)],
        Type::list(Type::ANY),
        |args| {
            let mut items = want_list(&args[0])?.clone();
            items.extend(want_list(&args[1])?.iter().cloned());
            Ok(Value::List(items))
        },
    ));

    register(Builtin::new(
        "concatStr",
        vec![Type::STR, Type::STR],
        Type::STR,
        |args| {
            Ok(Value::Str(format!(
                "{}{}",
                want_str(&args[0])?,
                want_str(&args[1])?
            )))
        },
    ));

    register(Builtin::new(
        "atStr",
        vec![Type::STR, Type::INT],
        Type::STR,
        |args| {
            let s = want_str(&args[0])?;
            let i = want_int(&args[1])?;
            if i < 0 {
                return Err(Diagnostic::new(format!("index out of bounds ({})", i)));
            }
            match s.chars().nth(i as usize) {
                Some(ch) => Ok(Value::Str(ch.to_string())),
                None => Err(Diagnostic::new(format!("index out of bounds ({})", i))),
            }
        },
    ));

    register(Builtin::new("lenStr", vec![Type::STR], Type::INT, |args| {
        Ok(Value::Int(want_str(&args[0])?.chars().count() as i64))
    }));

    register(Builtin::new(
        "sliceStr",
        vec![Type::STR, Type::INT, Type::INT],
        Type::STR,
        |args| {
            let chars: Vec<char> = want_str(&args[0])?.chars().collect();
            let len = chars.len() as i64;
            let mut begin = want_int(&args[1])?;
            let mut end = want_int(&args[2])?;
            if begin < 0 {
                begin = len + begin + 1;
            }
            if end < 0 {
                end = len + end + 1;
            }
            if begin < 0 || begin > len {
                return Err(Diagnostic::new(format!(
                    "begin index out of bounds ({})",
                    begin
                )));
            }
            if end < 0 || end > len {
                return Err(Diagnostic::new(format!("end index out of bounds ({})", end)));
            }
            if begin > end {
                return Err(Diagnostic::new(format!(
                    "begin index {} greater than end index {}",
                    begin, end
                )));
            }
            Ok(Value::Str(
                chars[begin as usize..end as usize].iter().collect(),
            ))
        },
    ));

    register(Builtin::new(
        "parseInt",
        vec![Type::STR],
        Type::INT,
        |args| {
            let s = want_str(&args[0])?;
            s.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Diagnostic::new(format!("cannot parse '{}' as int", s)))
        },
    ));

    register(Builtin::new("itoa", vec![Type::INT], Type::STR, |args| {
        Ok(Value::Str(want_int(&args[0])?.to_string()))
    }));

    register(Builtin::new(
        "toString",
        vec![Type::ANY],
        Type::STR,
        |args| Ok(Value::Str(args[0].to_string())),
    ));

    register(Builtin::new("print", vec![Type::ANY], Type::UNIT, |args| {
        println!("{}", args[0]);
        Ok(Value::Unit)
    }));

    register(Builtin::new("input", vec![], Type::STR, |_args| {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Diagnostic::new(format!("failed to read input: {}", e)))?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Value::Str(line))
    }));

    register(Builtin::new("sleep", vec![Type::INT], Type::UNIT, |args| {
        let millis = want_int(&args[0])?;
        if millis > 0 {
            std::thread::sleep(std::time::Duration::from_millis(millis as u64));
        }
        Ok(Value::Unit)
    }));

    (env, tenv)
}

fn want_list(value: &Value) -> Result<&Vec<Value>, Diagnostic> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(Diagnostic::new(format!(
            "expected list; got {}",
            other.kind()
        ))),
    }
}

fn want_int(value: &Value) -> Result<i64, Diagnostic> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(Diagnostic::new(format!(
            "expected int; got {}",
            other.kind()
        ))),
    }
}

fn want_str(value: &Value) -> Result<&str, Diagnostic> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(Diagnostic::new(format!(
            "expected string; got {}",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::interpreter::call_value;
    use crate::source::SourceLoc;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, Diagnostic> {
        let (env, _) = standard_env();
        let callee = env.lookup(name).expect("registered").clone();
        call_value(&callee, args, SourceLoc::default())
    }

    fn ints(ns: &[i64]) -> Value {
        Value::List(ns.iter().map(|n| Value::Int(*n)).collect())
    }

    #[test]
    fn len_and_range() {
        assert_eq!(call("len", vec![ints(&[1, 2, 3])]).unwrap(), Value::Int(3));
        assert_eq!(
            call("range", vec![Value::Int(0), Value::Int(3)]).unwrap(),
            ints(&[0, 1, 2])
        );
        assert_eq!(
            call("range", vec![Value::Int(3), Value::Int(0)]).unwrap(),
            ints(&[])
        );
    }

    #[test]
    fn list_builders_do_not_mutate() {
        let xs = ints(&[1, 2]);
        assert_eq!(
            call("append", vec![xs.clone(), Value::Int(3)]).unwrap(),
            ints(&[1, 2, 3])
        );
        assert_eq!(
            call("prepend", vec![Value::Int(0), xs.clone()]).unwrap(),
            ints(&[0, 1, 2])
        );
        assert_eq!(
            call("concat", vec![xs.clone(), ints(&[3])]).unwrap(),
            ints(&[1, 2, 3])
        );
        assert_eq!(xs, ints(&[1, 2]));
    }

    #[test]
    fn string_builtins() {
        let s = Value::Str("héllo".to_string());
        assert_eq!(call("lenStr", vec![s.clone()]).unwrap(), Value::Int(5));
        assert_eq!(
            call("atStr", vec![s.clone(), Value::Int(1)]).unwrap(),
            Value::Str("é".to_string())
        );
        assert!(call("atStr", vec![s.clone(), Value::Int(9)]).is_err());
        assert_eq!(
            call("sliceStr", vec![s.clone(), Value::Int(1), Value::Int(3)]).unwrap(),
            Value::Str("él".to_string())
        );
        // negative bound counts from one past the end
        assert_eq!(
            call("sliceStr", vec![s, Value::Int(0), Value::Int(-1)]).unwrap(),
            Value::Str("héllo".to_string())
        );
        assert_eq!(
            call(
                "concatStr",
                vec![Value::Str("a".into()), Value::Str("b".into())]
            )
            .unwrap(),
            Value::Str("ab".to_string())
        );
    }

    #[test]
    fn number_conversions() {
        assert_eq!(
            call("parseInt", vec![Value::Str("-42".into())]).unwrap(),
            Value::Int(-42)
        );
        assert!(call("parseInt", vec![Value::Str("4x".into())]).is_err());
        assert_eq!(
            call("itoa", vec![Value::Int(7)]).unwrap(),
            Value::Str("7".to_string())
        );
        assert_eq!(
            call("toString", vec![ints(&[1, 2])]).unwrap(),
            Value::Str("[1, 2]".to_string())
        );
    }

    #[test]
    fn signatures_are_registered_in_the_type_env() {
        let (_, tenv) = standard_env();
        assert_eq!(
            tenv.lookup("len"),
            Some(&Type::func([Type::list(Type::ANY)], Type::INT))
        );
        assert_eq!(
            tenv.lookup("range"),
            Some(&Type::func([Type::INT, Type::INT], Type::list(Type::INT)))
        );
        assert!(tenv.lookup("import").is_none());
    }

    #[test]
    fn arity_is_enforced() {
        assert!(call("len", vec![]).is_err());
        assert!(call("len", vec![ints(&[]), ints(&[])]).is_err());
    }
}
