use im::Vector;

use crate::ast::{FnArity, Value};
use crate::builtins::err;
use crate::def_builtin;
use crate::env::Env;
use crate::error::SprigError;

fn index_from(len: usize, idx: i64) -> Option<usize> {
    let resolved = if idx < 0 { len as i64 + idx } else { idx };
    if resolved < 0 || resolved >= len as i64 {
        None
    } else {
        Some(resolved as usize)
    }
}

/// Python-style slice bound: negative counts from the end, then clamps.
fn clamp_bound(len: usize, bound: i64) -> usize {
    let resolved = if bound < 0 { len as i64 + bound } else { bound };
    resolved.clamp(0, len as i64) as usize
}

fn int_arg(name: &str, value: &Value) -> Result<i64, SprigError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(SprigError::type_mismatch(
            format!("int (argument of {})", name),
            other.type_name(),
        )),
    }
}

pub(crate) fn install(env: &mut Env) {
    def_builtin!(env, "list", FnArity::at_least(0), |args| {
        Ok(Value::List(args.iter().cloned().collect()))
    });

    def_builtin!(env, "nth", FnArity::exact(2), |args| {
        let idx = int_arg("nth", &args[1])?;
        match &args[0] {
            Value::List(items) => match index_from(items.len(), idx) {
                Some(i) => Ok(items[i].clone()),
                None => err(format!("nth: index {} out of range (len {})", idx, items.len())),
            },
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                match index_from(chars.len(), idx) {
                    Some(i) => Ok(Value::Str(chars[i].to_string())),
                    None => err(format!("nth: index {} out of range (len {})", idx, chars.len())),
                }
            }
            other => Err(SprigError::type_mismatch("list or string", other.type_name())),
        }
    });

    def_builtin!(env, "slice", FnArity::range(3, 4), |args| {
        let start = int_arg("slice", &args[1])?;
        let end = int_arg("slice", &args[2])?;
        let step = match args.get(3) {
            Some(v) => int_arg("slice", v)?,
            None => 1,
        };
        if step < 1 {
            return err("slice: step must be positive");
        }
        match &args[0] {
            Value::List(items) => {
                let lo = clamp_bound(items.len(), start);
                let hi = clamp_bound(items.len(), end);
                let out: Vector<Value> = items
                    .iter()
                    .skip(lo)
                    .take(hi.saturating_sub(lo))
                    .step_by(step as usize)
                    .cloned()
                    .collect();
                Ok(Value::List(out))
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let lo = clamp_bound(chars.len(), start);
                let hi = clamp_bound(chars.len(), end);
                let out: String = chars
                    .iter()
                    .skip(lo)
                    .take(hi.saturating_sub(lo))
                    .step_by(step as usize)
                    .collect();
                Ok(Value::Str(out))
            }
            other => Err(SprigError::type_mismatch("list or string", other.type_name())),
        }
    });

    def_builtin!(env, "len", FnArity::exact(1), |args| {
        match &args[0] {
            Value::List(items) => Ok(Value::Int(items.len() as i64)),
            Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
            other => Err(SprigError::type_mismatch("list or string", other.type_name())),
        }
    });

    def_builtin!(env, "concat", FnArity::at_least(0), |args| {
        let mut out: Vector<Value> = Vector::new();
        for (idx, arg) in args.iter().enumerate() {
            let Value::List(items) = arg else {
                return Err(SprigError::type_mismatch(
                    format!("list (argument {} of concat)", idx + 1),
                    arg.type_name(),
                ));
            };
            out.append(items.clone());
        }
        Ok(Value::List(out))
    });

    def_builtin!(env, "range", FnArity::range(1, 3), |args| {
        let (start, stop, step) = match args.len() {
            1 => (0, int_arg("range", &args[0])?, 1),
            2 => (int_arg("range", &args[0])?, int_arg("range", &args[1])?, 1),
            _ => (
                int_arg("range", &args[0])?,
                int_arg("range", &args[1])?,
                int_arg("range", &args[2])?,
            ),
        };
        if step == 0 {
            return err("range: step must not be zero");
        }
        let mut out: Vector<Value> = Vector::new();
        let mut current = start;
        while (step > 0 && current < stop) || (step < 0 && current > stop) {
            out.push_back(Value::Int(current));
            current += step;
        }
        Ok(Value::List(out))
    });

    def_builtin!(env, "is_list", FnArity::exact(1), |args| {
        Ok(Value::Bool(matches!(args[0], Value::List(_))))
    });

    def_builtin!(env, "print", FnArity::at_least(0), |args| {
        let parts: Vec<String> = args.iter().map(|v| v.to_string()).collect();
        println!("{}", parts.join(" "));
        Ok(Value::Nil)
    });

    def_builtin!(env, "str", FnArity::at_least(0), |args| {
        let mut out = String::new();
        for arg in args {
            out.push_str(&arg.to_string());
        }
        Ok(Value::Str(out))
    });

    def_builtin!(env, "int", FnArity::range(1, 2), |args| {
        match (&args[0], args.get(1)) {
            (Value::Str(s), base) => {
                let radix = match base {
                    Some(v) => {
                        let b = int_arg("int", v)?;
                        if !(2..=36).contains(&b) {
                            return err("int: base must be in 2..36");
                        }
                        b as u32
                    }
                    None => 10,
                };
                match i64::from_str_radix(s.trim(), radix) {
                    Ok(n) => Ok(Value::Int(n)),
                    Err(_) => err(format!("int: cannot parse {:?}", s)),
                }
            }
            (Value::Int(n), None) => Ok(Value::Int(*n)),
            (Value::Float(n), None) => Ok(Value::Int(n.trunc() as i64)),
            (Value::Bool(b), None) => Ok(Value::Int(*b as i64)),
            (other, _) => Err(SprigError::type_mismatch(
                "string, number, or bool",
                other.type_name(),
            )),
        }
    });

    def_builtin!(env, "float", FnArity::exact(1), |args| {
        match &args[0] {
            Value::Str(s) => match s.trim().parse::<f64>() {
                Ok(n) => Ok(Value::Float(n)),
                Err(_) => err(format!("float: cannot parse {:?}", s)),
            },
            Value::Int(n) => Ok(Value::Float(*n as f64)),
            Value::Float(n) => Ok(Value::Float(*n)),
            other => Err(SprigError::type_mismatch("string or number", other.type_name())),
        }
    });
}
