//! End-to-end evaluation tests: the full pipeline (lex → parse → check →
//! eval) driven through the library API, covering the language's core
//! scenarios and runtime failure modes.

use pretty_assertions::assert_eq;
use rill::error::Diagnostic;
use rill::eval::{standard_env, Value};
use rill::source::SourceMap;

fn run(src: &str) -> Result<Value, Diagnostic> {
    let mut sources = SourceMap::new();
    let (env, tenv) = standard_env();
    rill::run_file(&mut sources, "test", src, &env, &tenv)
}

fn ints(ns: &[i64]) -> Value {
    Value::List(ns.iter().map(|n| Value::Int(*n)).collect())
}

#[test]
fn let_binding_and_arithmetic() {
    assert_eq!(run("let x = 1 in x + 2").unwrap(), Value::Int(3));
}

#[test]
fn recursive_fibonacci() {
    let src = "let f = func(n int) int if n < 2 then n else f(n - 1) + f(n - 2) in f(10)";
    assert_eq!(run(src).unwrap(), Value::Int(55));
}

#[test]
fn squares_comprehension() {
    assert_eq!(
        run("let xs = [1, 2, 3] in [x * x for x in xs]").unwrap(),
        ints(&[1, 4, 9])
    );
}

#[test]
fn object_fields_across_bindings() {
    let src = "let p = {name: \"a\", n: 2}, q = {name: \"b\", n: 3} in p.n + q.n";
    assert_eq!(run(src).unwrap(), Value::Int(5));
}

#[test]
fn match_on_runtime_type() {
    let src =
        "let f = func(x any) int match v on x case int v case string 0 in f(\"hi\") + f(7)";
    assert_eq!(run(src).unwrap(), Value::Int(7));
}

#[test]
fn branch_taken_determines_failure() {
    assert_eq!(
        run("if 1 < 2 then [1, 2][0] else 0").unwrap(),
        Value::Int(1)
    );

    let err = run("if 1 < 2 then [1, 2][5] else 0").unwrap_err();
    assert_eq!(err.message, "index out of bounds (5)");
    // location is the index expression
    assert_eq!(err.location.unwrap().column, 21);
}

#[test]
fn ill_typed_call_is_rejected_statically() {
    let src = "let add = func(a int, b int) int a + b in add(2, \"hi\")";
    let err = run(src).unwrap_err();
    assert!(err
        .root_cause()
        .message
        .contains("expected argument of type int"));
}

#[test]
fn closure_identity_and_observational_equality() {
    // two evaluations of the same func expression are distinct values
    assert_eq!(
        run("let mk = func() func(x int) int x * 2 in mk() is mk()").unwrap(),
        Value::Bool(false)
    );
    // but they behave identically
    assert_eq!(
        run("let mk = func() func(x int) int x * 2 in (mk())(21) is (mk())(21)").unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn short_circuiting_has_no_observable_right_effect() {
    // the right operand would divide by zero if evaluated
    assert_eq!(
        run("let b = true in b or 1 / 0 is 1").unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        run("let b = false in b and 1 / 0 is 1").unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn comprehension_length_and_order() {
    assert_eq!(
        run("[x - 1 for x in range(0, 5)]").unwrap(),
        ints(&[-1, 0, 1, 2, 3])
    );
    assert_eq!(run("len([x for x in range(0, 9)])").unwrap(), Value::Int(9));
    assert_eq!(run("[x for x in []]").unwrap(), ints(&[]));
}

#[test]
fn range_reproduces_indices() {
    let src = "let xs = [10, 20, 30] in [xs[i] for i in range(0, len(xs))]";
    assert_eq!(run(src).unwrap(), ints(&[10, 20, 30]));
}

#[test]
fn slicing_laws() {
    // xs[i:j] has length j - i
    assert_eq!(
        run("len(range(0, 10)[2:7])").unwrap(),
        Value::Int(5)
    );
    // xs[0:len(xs)] == xs
    assert_eq!(
        run("let xs = range(0, 10) in xs[0:len(xs)] is xs").unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn nested_closures_capture_lexically() {
    let src = "let adder = func(a int) func(int) int func(b int) int a + b in (adder(2))(3)";
    assert_eq!(run(src).unwrap(), Value::Int(5));
}

#[test]
fn higher_order_functions() {
    let src = "let twice = func(f func(int) int, x int) int f(f(x)) in \
               twice(func(n int) int n * 3, 2)";
    assert_eq!(run(src).unwrap(), Value::Int(18));
}

#[test]
fn string_builtins_compose() {
    let src = "let s = concatStr(\"ri\", \"ll\") in \
               concatStr(atStr(s, 0), sliceStr(s, 1, lenStr(s)))";
    assert_eq!(run(src).unwrap(), Value::Str("rill".to_string()));
}

#[test]
fn to_string_and_parse_int() {
    assert_eq!(
        run("parseInt(itoa(42)) + parseInt(\"-2\")").unwrap(),
        Value::Int(40)
    );
    assert_eq!(
        run("toString([1, {a: true}])").unwrap(),
        Value::Str("[1, {a: true}]".to_string())
    );
    let err = run("parseInt(\"4x\")").unwrap_err();
    assert_eq!(err.message, "in call to parseInt");
}

#[test]
fn runtime_trace_nests_call_sites() {
    let src = "let inner = func() int 1 / 0, outer = func() int inner() in outer()";
    let err = run(src).unwrap_err();
    let messages: Vec<_> = err.chain().map(|d| d.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["in call to outer", "in call to inner", "division by zero"]
    );
}

#[test]
fn match_cast_together() {
    let src = "let narrow = func(v any) int match w on v \
               case [int] len(w) \
               case {n: int} w.n \
               case int w \
               case any 0 \
               in narrow([1, 2, 3]) * 100 + narrow({n: 7}) * 10 + narrow(5)";
    assert_eq!(run(src).unwrap(), Value::Int(375));
}

#[test]
fn first_matching_arm_wins_in_order() {
    // int is covered by both arms; the first one is taken
    let src = "match v on 3 case any \"wide\" case int \"narrow\"";
    assert_eq!(run(src).unwrap(), Value::Str("wide".to_string()));
}

#[test]
fn cast_of_empty_list_succeeds_everywhere() {
    assert_eq!(run("[] as [int]").unwrap(), ints(&[]));
    assert_eq!(run("[] as [{a: string}]").unwrap(), ints(&[]));
}

#[test]
fn this_binding_in_object_literals() {
    let src = "let o = {base: 3, double: this.base * 2, all: this.base + this.double} in o.all";
    assert_eq!(run(src).unwrap(), Value::Int(9));
}

#[test]
fn deep_recursion_is_linear_in_the_host_stack() {
    // enough to prove the self-binding patch holds across many frames,
    // small enough to stay inside the host stack
    let src = "let sum = func(n int) int if n is 0 then 0 else n + sum(n - 1) in sum(200)";
    assert_eq!(run(src).unwrap(), Value::Int(20100));
}

#[test]
fn type_soundness_spot_checks() {
    use rill::lexer::tokenize;
    use rill::parser::Parser;
    use rill::source::FileId;
    use rill::typecheck::{check, TypeEnv};
    use rill::eval::{eval, Environment};

    // if type(e) = T and e evaluates to v, then T ≽ type_of(v)
    for src in [
        "if true then 1 else \"s\"",
        "[1, 2, 3]",
        "[1, \"x\"]",
        "{a: 1, b: [true]}",
        "let f = func(n int) int n in f",
        "match v on 3 case int [v] case any \"s\"",
    ] {
        let toks = tokenize(FileId::default(), &[src.to_string()]).unwrap();
        let expr = Parser::new(toks).parse_program().unwrap();
        let ty = check(&expr, &TypeEnv::new()).unwrap();
        let value = eval(&expr, &Environment::new()).unwrap();
        assert!(
            ty.is_supertype_of(&value.type_of()),
            "{}: {} should cover {}",
            src,
            ty,
            value.type_of()
        );
    }
}
