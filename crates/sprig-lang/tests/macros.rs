use sprig_core::ast::Value;
use sprig_core::error::SprigError;
use sprig_core::{eval_source, EvalOptions, Interpreter};

fn eval(src: &str) -> Result<Value, SprigError> {
    eval_source(src, None)
}

fn eval_ok(src: &str) -> Value {
    eval(src).unwrap_or_else(|err| panic!("{:?} failed: {}", src, err))
}

#[test]
fn stdlib_when_runs_its_body_in_order() {
    assert_eq!(eval_ok("(when (= 1 1) 1 2 3)"), Value::Int(3));
    assert_eq!(eval_ok("(when false 1)"), Value::Nil);
    assert_eq!(
        eval_ok("(def hits (list)) (when true (def hits (append hits 1)) (def hits (append hits 2))) hits"),
        Value::list_from(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn stdlib_unless_inverts_the_condition() {
    assert_eq!(eval_ok("(unless false 5)"), Value::Int(5));
    assert_eq!(eval_ok("(unless true 5)"), Value::Nil);
}

#[test]
fn macro_arguments_arrive_unevaluated() {
    // The argument would explode if it were evaluated before expansion.
    assert_eq!(
        eval_ok(
            "(defmacro ignore-it (e) None)
             (ignore-it (undefined_symbol 1))"
        ),
        Value::Nil
    );
}

#[test]
fn quote_unquote_builds_macro_output() {
    let out = eval_ok(
        "(defmacro twice (e) (' do ~e ~e))
         (def count 0)
         (defn bump () (def count (+ count 1)))
         (twice (bump))
         count",
    );
    assert_eq!(out, Value::Int(2));
}

#[test]
fn macros_can_recurse_through_expansion() {
    // Each expansion peels one element off the literal list.
    let out = eval_ok(
        "(defmacro sum-lit (items)
             (if (= 0 (len items))
                 0
                 (list '+ (first items) (list 'sum-lit (rest items)))))
         (sum-lit (1 2 3 4))",
    );
    assert_eq!(out, Value::Int(10));
}

#[test]
fn expansion_happens_in_the_callers_environment() {
    let out = eval_ok(
        "(defmacro add-x (e) (list '+ 'x e))
         (let (x 10) (add-x 5))",
    );
    assert_eq!(out, Value::Int(15));
}

#[test]
fn letfn_binds_without_touching_the_root() {
    let interp = Interpreter::new(EvalOptions::default()).unwrap();
    assert_eq!(
        interp
            .eval_source("(letfn (add2 (a b) (+ a b)) (add2 3 4))")
            .unwrap(),
        Value::Int(7)
    );
    assert!(matches!(
        interp.eval_source("(add2 1 2)"),
        Err(SprigError::UnboundSymbol(_))
    ));
}

#[test]
fn macro_output_must_be_representable_as_code() {
    let err = eval("(defmacro bad () inc) (bad)").unwrap_err();
    assert!(matches!(err, SprigError::TypeMismatch { .. }));
}

#[test]
fn macro_arity_mismatch_is_an_arity_error() {
    let err = eval("(defmacro one (a) a) (one 1 2)").unwrap_err();
    assert!(matches!(err, SprigError::Arity(_)));
}

#[test]
fn macros_are_not_first_class_callables() {
    // Expansion keys off the head symbol; a macro smuggled in as a
    // value cannot be applied.
    let err = eval("((first (list when)) true 1)").unwrap_err();
    assert!(matches!(err, SprigError::NotCallable(_)));
}
