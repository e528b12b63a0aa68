use sprig_core::ast::Value;
use sprig_core::error::SprigError;
use sprig_core::{eval_source, EvalOptions, Interpreter};

fn eval(src: &str) -> Result<Value, SprigError> {
    eval_source(src, None)
}

fn eval_ok(src: &str) -> Value {
    eval(src).unwrap_or_else(|err| panic!("{:?} failed: {}", src, err))
}

fn ints(ns: &[i64]) -> Value {
    Value::list_from(ns.iter().map(|n| Value::Int(*n)).collect())
}

#[test]
fn variadic_addition() {
    assert_eq!(eval_ok("(+ 1 2 3)"), Value::Int(6));
}

#[test]
fn let_binds_sequentially() {
    assert_eq!(eval_ok("(let (x 2 y 3) (* x y))"), Value::Int(6));
    assert_eq!(eval_ok("(let (x 2 y (+ x 1)) (* x y))"), Value::Int(6));
}

#[test]
fn recursive_function_definition() {
    let out = eval_ok(
        "(defn fact (n) (if (= n 0) 1 (* n (fact (- n 1)))))
         (fact 5)",
    );
    assert_eq!(out, Value::Int(120));
}

#[test]
fn user_macro_with_rest_parameter() {
    let out = eval_ok(
        "(defmacro when (c & body) (list 'if c (cons 'do body) None))
         (when (= 1 1) 7)",
    );
    assert_eq!(out, Value::Int(7));
}

#[test]
fn quote_with_selective_unquote() {
    assert_eq!(
        eval_ok("(let (x 2) (' 1 ~ x ~(inc x) 4))"),
        ints(&[1, 2, 3, 4])
    );
}

#[test]
fn match_picks_the_first_accepting_clause() {
    let out = eval_ok(
        "(match (list 1 2 3)
             ((a) \"one\")
             ((a b c) \"three\")
             (_ \"other\"))",
    );
    assert_eq!(out, Value::Str("three".to_string()));
}

#[test]
fn match_binds_nested_patterns() {
    assert_eq!(
        eval_ok("(match (list 1 (list 2 3)) ((a (b c)) (+ a b c)))"),
        Value::Int(6)
    );
    assert_eq!(
        eval_ok("(match (list 1 2 3) ((x & xs) xs))"),
        ints(&[2, 3])
    );
    assert_eq!(
        eval_ok("(match 9 ((a b) \"pair\") (n (* n n)))"),
        Value::Int(81)
    );
}

#[test]
fn let_destructures_patterns() {
    assert_eq!(
        eval_ok("(let ((a b) (list 1 2) c (+ a b)) (list a b c))"),
        ints(&[1, 2, 3])
    );
    assert_eq!(
        eval_ok("(let ((x & xs) (range 5)) (list x (len xs)))"),
        ints(&[0, 4])
    );
}

#[test]
fn defn_rest_parameter_collects_varargs() {
    assert_eq!(
        eval_ok("(defn my-rest (x & xs) xs) (my-rest 1 2 3)"),
        ints(&[2, 3])
    );
    assert_eq!(
        eval_ok("(defn count-args (& args) (len args)) (count-args)"),
        Value::Int(0)
    );
}

#[test]
fn call_site_spread_splices_a_list() {
    assert_eq!(
        eval_ok("(defn f (x y z) (+ x y z)) (f 1 & (list 2 3))"),
        Value::Int(6)
    );
    assert_eq!(eval_ok("(+ & (list 1 2 3))"), Value::Int(6));
}

#[test]
fn spread_must_be_final_but_one() {
    assert!(eval("(+ & (list 1 2) 3)").is_err());
}

#[test]
fn anonymous_function_placeholders() {
    assert_eq!(eval_ok("((# * %0 2) 21)"), Value::Int(42));
    assert_eq!(eval_ok("((# + %0 %1) 1 2)"), Value::Int(3));
    assert_eq!(eval_ok("((# 7))"), Value::Int(7));
}

#[test]
fn nested_short_fns_keep_their_own_placeholders() {
    // The inner # owns %0; the outer one takes no parameters.
    assert_eq!(eval_ok("(((# (# * %0 3))) 5)"), Value::Int(15));
}

#[test]
fn do_sequences_and_returns_last() {
    assert_eq!(eval_ok("(do (+ 1 1) (- 1 1))"), Value::Int(0));
    assert_eq!(eval_ok("(do (def a 1) (def b 2) (+ a b))"), Value::Int(3));
    assert_eq!(eval_ok("(do)"), Value::Nil);
}

#[test]
fn comment_evaluates_nothing() {
    assert_eq!(eval_ok("(comment (explode now))"), Value::Nil);
    assert_eq!(eval_ok("(do (comment 1) 5)"), Value::Int(5));
}

#[test]
fn def_chains_and_returns_the_last_value() {
    let interp = Interpreter::new(EvalOptions::default()).unwrap();
    assert_eq!(
        interp.eval_source("(def x 1 y (+ x 1))").unwrap(),
        Value::Int(2)
    );
    assert_eq!(interp.eval_source("(+ x y)").unwrap(), Value::Int(3));
}

#[test]
fn dollar_resolves_a_name_from_a_string() {
    assert_eq!(eval_ok("(let (foo 42) ($ \"foo\"))"), Value::Int(42));
    assert_eq!(
        eval_ok("(def bar 7) ($ (+ \"b\" \"ar\"))"),
        Value::Int(7)
    );
    assert!(matches!(
        eval("($ \"missing\")"),
        Err(SprigError::UnboundSymbol(_))
    ));
}

#[test]
fn pyimport_binds_host_modules() {
    let out = eval_ok("(pyimport math) ((. math sqrt) 9)");
    assert_eq!(out, Value::Float(3.0));
    let out = eval_ok("(pyimport math strings) ((. strings upper) \"abc\")");
    assert_eq!(out, Value::Str("ABC".to_string()));
}

#[test]
fn dotted_symbols_walk_host_attributes() {
    let out = eval_ok("(pyimport math) math.pi");
    match out {
        Value::Float(pi) => assert!((pi - std::f64::consts::PI).abs() < 1e-12),
        other => panic!("expected float, got {:?}", other),
    }
    assert_eq!(eval_ok("(pyimport math) (math.floor 2.7)"), Value::Int(2));
}

#[test]
fn pyimport_from_binds_a_single_attribute() {
    assert_eq!(
        eval_ok("(pyimport_from strings upper) (upper \"sprig\")"),
        Value::Str("SPRIG".to_string())
    );
}

#[test]
fn and_or_short_circuit() {
    assert_eq!(eval_ok("(and false (undefined_symbol))"), Value::Bool(false));
    assert_eq!(eval_ok("(or 1 (undefined_symbol))"), Value::Bool(true));
    assert_eq!(eval_ok("(and 1 2 3)"), Value::Bool(true));
    assert_eq!(eval_ok("(or false None)"), Value::Bool(false));
    let out = eval_ok(
        "(def calls (list))
         (defn canary (x) (do (def calls (append calls x)) x))
         (and (canary false) (canary 1))
         calls",
    );
    assert_eq!(out, Value::list_from(vec![Value::Bool(false)]));
}

#[test]
fn eval_runs_quoted_data() {
    assert_eq!(eval_ok("(eval '(+ 1 2))"), Value::Int(3));
    assert_eq!(eval_ok("(eval (cons '+ (list 1 2 3)))"), Value::Int(6));
}

#[test]
fn if_without_else_produces_nil() {
    assert_eq!(eval_ok("(if false 1)"), Value::Nil);
}

#[test]
fn string_concatenation_with_plus() {
    assert_eq!(eval_ok("(+ \"ab\" \"cd\")"), Value::Str("abcd".to_string()));
    assert_eq!(eval_ok("(+ (list 1) (list 2 3))"), ints(&[1, 2, 3]));
}
