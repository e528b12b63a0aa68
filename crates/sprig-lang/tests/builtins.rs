use sprig_core::ast::Value;
use sprig_core::error::SprigError;
use sprig_core::eval_source;

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
fn arithmetic_identities_and_folds() {
    assert_eq!(eval_ok("(+)"), Value::Int(0));
    assert_eq!(eval_ok("(*)"), Value::Int(1));
    assert_eq!(eval_ok("(- 5)"), Value::Int(-5));
    assert_eq!(eval_ok("(- 10 1 2)"), Value::Int(7));
    assert_eq!(eval_ok("(* 2 3 4)"), Value::Int(24));
    assert_eq!(eval_ok("(+ 1 2.5)"), Value::Float(3.5));
}

#[test]
fn division_stays_integral_when_exact() {
    assert_eq!(eval_ok("(/ 20 2 2)"), Value::Int(5));
    assert_eq!(eval_ok("(/ 3 2)"), Value::Float(1.5));
    assert_eq!(eval_ok("(/ 2)"), Value::Float(0.5));
    assert!(matches!(eval("(/ 1 0)"), Err(SprigError::Runtime(_))));
}

#[test]
fn modulo_follows_the_sign_of_the_divisor() {
    assert_eq!(eval_ok("(% 7 3)"), Value::Int(1));
    assert_eq!(eval_ok("(% -7 3)"), Value::Int(2));
    assert!(eval("(% 1 0)").is_err());
}

#[test]
fn comparisons_chain_across_all_operands() {
    assert_eq!(eval_ok("(< 1 2 3)"), Value::Bool(true));
    assert_eq!(eval_ok("(< 1 3 2)"), Value::Bool(false));
    assert_eq!(eval_ok("(<= 1 1 2)"), Value::Bool(true));
    assert_eq!(eval_ok("(> 3 2 1)"), Value::Bool(true));
    assert_eq!(eval_ok("(>= 2 2 3)"), Value::Bool(false));
}

#[test]
fn equality_is_numeric_across_int_and_float() {
    assert_eq!(eval_ok("(= 1 1.0)"), Value::Bool(true));
    assert_eq!(eval_ok("(= 1 1 1)"), Value::Bool(true));
    assert_eq!(eval_ok("(!= 1 2)"), Value::Bool(true));
    assert_eq!(eval_ok("(= (list 1 2) (list 1 2))"), Value::Bool(true));
    assert_eq!(eval_ok("(= \"a\" \"a\")"), Value::Bool(true));
}

#[test]
fn list_primitives() {
    assert_eq!(eval_ok("(list 1 2)"), ints(&[1, 2]));
    assert_eq!(eval_ok("(nth (list 1 2 3) 0)"), Value::Int(1));
    assert_eq!(eval_ok("(nth (list 1 2 3) -1)"), Value::Int(3));
    assert_eq!(eval_ok("(nth \"abc\" 1)"), Value::Str("b".to_string()));
    assert!(eval("(nth (list 1) 5)").is_err());
    assert_eq!(eval_ok("(slice (list 1 2 3 4) 1 3)"), ints(&[2, 3]));
    assert_eq!(eval_ok("(slice (list 1 2 3 4) 0 -1)"), ints(&[1, 2, 3]));
    assert_eq!(
        eval_ok("(slice \"abcd\" 0 4 2)"),
        Value::Str("ac".to_string())
    );
    assert_eq!(eval_ok("(len (list 1 2 3))"), Value::Int(3));
    assert_eq!(eval_ok("(len \"hello\")"), Value::Int(5));
    assert_eq!(eval_ok("(concat (list 1) (list 2 3) (list))"), ints(&[1, 2, 3]));
    assert_eq!(eval_ok("(concat)"), ints(&[]));
}

#[test]
fn range_mirrors_the_host_convention() {
    assert_eq!(eval_ok("(range 3)"), ints(&[0, 1, 2]));
    assert_eq!(eval_ok("(range 1 4)"), ints(&[1, 2, 3]));
    assert_eq!(eval_ok("(range 5 0 -2)"), ints(&[5, 3, 1]));
    assert_eq!(eval_ok("(range 0)"), ints(&[]));
    assert!(eval("(range 0 5 0)").is_err());
}

#[test]
fn min_max_keep_the_winning_value() {
    assert_eq!(eval_ok("(min 3 1 2)"), Value::Int(1));
    assert_eq!(eval_ok("(max 3 1 2.5)"), Value::Int(3));
    assert_eq!(eval_ok("(min 1.5 2)"), Value::Float(1.5));
}

#[test]
fn conversions() {
    assert_eq!(eval_ok("(int \"12\")"), Value::Int(12));
    assert_eq!(eval_ok("(int \"ff\" 16)"), Value::Int(255));
    assert_eq!(eval_ok("(int 3.9)"), Value::Int(3));
    assert_eq!(eval_ok("(int true)"), Value::Int(1));
    assert!(eval("(int \"abc\")").is_err());
    assert_eq!(eval_ok("(float \"2.5\")"), Value::Float(2.5));
    assert_eq!(eval_ok("(float 2)"), Value::Float(2.0));
    assert_eq!(eval_ok("(str 1 \"a\")"), Value::Str("1a".to_string()));
    assert_eq!(eval_ok("(str (list 1 2))"), Value::Str("(1 2)".to_string()));
    assert_eq!(eval_ok("(str)"), Value::Str(String::new()));
}

#[test]
fn logic_builtins() {
    assert_eq!(eval_ok("(not None)"), Value::Bool(true));
    assert_eq!(eval_ok("(not 0)"), Value::Bool(false));
    assert_eq!(eval_ok("(is_list (list))"), Value::Bool(true));
    assert_eq!(eval_ok("(is_list \"no\")"), Value::Bool(false));
}

#[test]
fn stdlib_sequence_functions() {
    assert_eq!(eval_ok("(map inc (list 1 2 3))"), ints(&[2, 3, 4]));
    assert_eq!(eval_ok("(filter zero? (list 0 1 0 2))"), ints(&[0, 0]));
    assert_eq!(eval_ok("(reduce + 0 (range 5))"), Value::Int(10));
    assert_eq!(
        eval_ok("(flatten (list 1 (list 2 (list 3)) 4))"),
        ints(&[1, 2, 3, 4])
    );
    assert_eq!(eval_ok("(cons 0 (list 1))"), ints(&[0, 1]));
    assert_eq!(eval_ok("(append (list 1) 2)"), ints(&[1, 2]));
    assert_eq!(eval_ok("(first (list 7 8))"), Value::Int(7));
    assert_eq!(eval_ok("(second (list 7 8))"), Value::Int(8));
    assert_eq!(eval_ok("(last (list 7 8 9))"), Value::Int(9));
    assert_eq!(eval_ok("(rest (list 1 2 3))"), ints(&[2, 3]));
    assert_eq!(eval_ok("(rest (list))"), ints(&[]));
    assert_eq!(eval_ok("(skip 2 (list 1 2 3 4))"), ints(&[3, 4]));
    assert_eq!(eval_ok("(empty? (list))"), Value::Bool(true));
    assert_eq!(eval_ok("(empty? (list 1))"), Value::Bool(false));
}

#[test]
fn stdlib_zip_stops_at_the_shortest() {
    assert_eq!(
        eval_ok("(zip (list 1 2) (list 3 4 5))"),
        Value::list_from(vec![ints(&[1, 3]), ints(&[2, 4])])
    );
    assert_eq!(eval_ok("(zip)"), ints(&[]));
    assert_eq!(eval_ok("(zip (list) (list 1))"), ints(&[]));
}

#[test]
fn stdlib_apply_and_curry() {
    assert_eq!(eval_ok("(apply + (list 1 2 3))"), Value::Int(6));
    assert_eq!(eval_ok("((curry + 1 2) 3 4)"), Value::Int(10));
}

#[test]
fn builtin_arity_is_checked() {
    assert!(matches!(eval("(len)"), Err(SprigError::Arity(_))));
    assert!(matches!(eval("(nth (list 1))"), Err(SprigError::Arity(_))));
}

#[test]
fn builtins_can_be_redefined_at_root() {
    assert_eq!(eval_ok("(def len (# 99)) (len)"), Value::Int(99));
}
