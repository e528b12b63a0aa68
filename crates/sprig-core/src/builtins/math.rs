use crate::ast::{FnArity, Value};
use crate::builtins::err;
use crate::def_builtin;
use crate::env::Env;
use crate::error::SprigError;

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(n) => n,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int(n),
            Num::Float(n) => Value::Float(n),
        }
    }
}

fn to_num(name: &str, value: &Value) -> Result<Num, SprigError> {
    match value {
        Value::Int(n) => Ok(Num::Int(*n)),
        Value::Float(n) => Ok(Num::Float(*n)),
        other => Err(SprigError::type_mismatch(
            format!("number (operand of {})", name),
            other.type_name(),
        )),
    }
}

/// Left fold over numeric operands. Integer arithmetic stays integral
/// until it meets a float or overflows i64.
fn fold_numeric(
    name: &str,
    first: Num,
    rest: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, SprigError> {
    let mut acc = first;
    for value in rest {
        let next = to_num(name, value)?;
        acc = match (acc, next) {
            (Num::Int(a), Num::Int(b)) => match int_op(a, b) {
                Some(n) => Num::Int(n),
                None => Num::Float(float_op(a as f64, b as f64)),
            },
            (a, b) => Num::Float(float_op(a.as_f64(), b.as_f64())),
        };
    }
    Ok(acc.into_value())
}

fn chain_compare(
    name: &'static str,
    args: &[Value],
    cmp: fn(f64, f64) -> bool,
) -> Result<Value, SprigError> {
    for pair in args.windows(2) {
        let a = to_num(name, &pair[0])?.as_f64();
        let b = to_num(name, &pair[1])?.as_f64();
        if !cmp(a, b) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn all_equal(args: &[Value]) -> bool {
    args.windows(2).all(|pair| pair[0] == pair[1])
}

pub(crate) fn install(env: &mut Env) {
    def_builtin!(env, "+", FnArity::at_least(0), |args| {
        match args.first() {
            None => Ok(Value::Int(0)),
            Some(Value::Str(first)) => {
                let mut buf = first.clone();
                for (idx, arg) in args.iter().enumerate().skip(1) {
                    let Value::Str(s) = arg else {
                        return err(format!("+ expects string (argument {})", idx + 1));
                    };
                    buf.push_str(s);
                }
                Ok(Value::Str(buf))
            }
            Some(Value::List(first)) => {
                let mut out = first.clone();
                for (idx, arg) in args.iter().enumerate().skip(1) {
                    let Value::List(items) = arg else {
                        return err(format!("+ expects list (argument {})", idx + 1));
                    };
                    out.append(items.clone());
                }
                Ok(Value::List(out))
            }
            Some(first) => fold_numeric(
                "+",
                to_num("+", first)?,
                &args[1..],
                i64::checked_add,
                |a, b| a + b,
            ),
        }
    });

    def_builtin!(env, "-", FnArity::at_least(1), |args| {
        let first = to_num("-", &args[0])?;
        if args.len() == 1 {
            return Ok(match first {
                Num::Int(n) => Value::Int(-n),
                Num::Float(n) => Value::Float(-n),
            });
        }
        fold_numeric("-", first, &args[1..], i64::checked_sub, |a, b| a - b)
    });

    def_builtin!(env, "*", FnArity::at_least(0), |args| {
        match args.first() {
            None => Ok(Value::Int(1)),
            Some(first) => fold_numeric(
                "*",
                to_num("*", first)?,
                &args[1..],
                i64::checked_mul,
                |a, b| a * b,
            ),
        }
    });

    def_builtin!(env, "/", FnArity::at_least(1), |args| {
        let mut acc = to_num("/", &args[0])?;
        let divisors: &[Value] = if args.len() == 1 {
            acc = Num::Int(1);
            args
        } else {
            &args[1..]
        };
        for value in divisors {
            let next = to_num("/", value)?;
            if next.as_f64() == 0.0 {
                return err("division by zero");
            }
            acc = match (acc, next) {
                (Num::Int(a), Num::Int(b)) if a % b == 0 => Num::Int(a / b),
                (a, b) => Num::Float(a.as_f64() / b.as_f64()),
            };
        }
        Ok(acc.into_value())
    });

    def_builtin!(env, "%", FnArity::exact(2), |args| {
        match (to_num("%", &args[0])?, to_num("%", &args[1])?) {
            (_, Num::Int(0)) => err("modulo by zero"),
            (Num::Int(a), Num::Int(b)) => Ok(Value::Int(a.rem_euclid(b))),
            (a, b) => {
                if b.as_f64() == 0.0 {
                    return err("modulo by zero");
                }
                Ok(Value::Float(a.as_f64().rem_euclid(b.as_f64())))
            }
        }
    });

    def_builtin!(env, "=", FnArity::at_least(1), |args| {
        Ok(Value::Bool(all_equal(args)))
    });

    def_builtin!(env, "!=", FnArity::at_least(1), |args| {
        Ok(Value::Bool(!all_equal(args)))
    });

    def_builtin!(env, "<", FnArity::at_least(1), |args| {
        chain_compare("<", args, |a, b| a < b)
    });

    def_builtin!(env, "<=", FnArity::at_least(1), |args| {
        chain_compare("<=", args, |a, b| a <= b)
    });

    def_builtin!(env, ">", FnArity::at_least(1), |args| {
        chain_compare(">", args, |a, b| a > b)
    });

    def_builtin!(env, ">=", FnArity::at_least(1), |args| {
        chain_compare(">=", args, |a, b| a >= b)
    });

    def_builtin!(env, "not", FnArity::exact(1), |args| {
        Ok(Value::Bool(!args[0].is_truthy()))
    });

    // Function-valued `and`/`or` for first-class use (`(map and ...)`);
    // direct calls hit the short-circuiting special forms instead.
    def_builtin!(env, "and", FnArity::at_least(0), |args| {
        Ok(Value::Bool(args.iter().all(Value::is_truthy)))
    });

    def_builtin!(env, "or", FnArity::at_least(0), |args| {
        Ok(Value::Bool(args.iter().any(Value::is_truthy)))
    });

    def_builtin!(env, "min", FnArity::at_least(1), |args| {
        pick("min", args, |a, b| a < b)
    });

    def_builtin!(env, "max", FnArity::at_least(1), |args| {
        pick("max", args, |a, b| a > b)
    });
}

fn pick(name: &str, args: &[Value], wins: fn(f64, f64) -> bool) -> Result<Value, SprigError> {
    let mut best = &args[0];
    let mut best_num = to_num(name, best)?.as_f64();
    for value in &args[1..] {
        let num = to_num(name, value)?.as_f64();
        if wins(num, best_num) {
            best = value;
            best_num = num;
        }
    }
    Ok(best.clone())
}
