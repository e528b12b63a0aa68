use im::Vector;

use crate::ast::{Form, FormKind, Value};
use crate::printer::value_preview;

pub const REST_MARKER: &str = "&";

/// Non-fatal signal that a pattern did not accept a value. `match` turns
/// it into "try the next clause"; function application turns it into an
/// arity error.
#[derive(Clone, Debug)]
pub struct Mismatch {
    pub reason: String,
}

impl Mismatch {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Bind a pattern against a value, producing the name/value pairs to
/// install. A symbol takes the whole value; a list pattern binds
/// positionally against a list value, recursing into nested patterns;
/// `&` in final-but-one position collects the rest as a list.
pub fn destructure(pattern: &Form, value: &Value) -> Result<Vec<(String, Value)>, Mismatch> {
    let mut bindings = Vec::new();
    bind(pattern, value, &mut bindings)?;
    Ok(bindings)
}

fn bind(
    pattern: &Form,
    value: &Value,
    bindings: &mut Vec<(String, Value)>,
) -> Result<(), Mismatch> {
    match &pattern.kind {
        FormKind::Symbol(name) if name == REST_MARKER => {
            Err(Mismatch::new("'&' must sit in final-but-one position"))
        }
        FormKind::Symbol(name) => {
            bindings.push((name.clone(), value.clone()));
            Ok(())
        }
        FormKind::List(patterns) => {
            let Value::List(items) = value else {
                return Err(Mismatch::new(format!(
                    "expected a list to destructure, got {}",
                    value.type_name()
                )));
            };
            bind_list(patterns, items, bindings)
        }
        _ => Err(Mismatch::new("pattern must be a symbol or a list")),
    }
}

fn bind_list(
    patterns: &[Form],
    items: &Vector<Value>,
    bindings: &mut Vec<(String, Value)>,
) -> Result<(), Mismatch> {
    let rest_at = patterns
        .iter()
        .position(|p| p.symbol_name() == Some(REST_MARKER));
    match rest_at {
        Some(pos) if pos + 2 == patterns.len() => {
            let fixed = &patterns[..pos];
            if items.len() < fixed.len() {
                return Err(Mismatch::new(format!(
                    "expected at least {} values, got {}",
                    fixed.len(),
                    items.len()
                )));
            }
            for (pattern, item) in fixed.iter().zip(items.iter()) {
                bind(pattern, item, bindings)?;
            }
            let rest: Vector<Value> = items.iter().skip(fixed.len()).cloned().collect();
            bind(&patterns[pos + 1], &Value::List(rest), bindings)
        }
        Some(_) => Err(Mismatch::new("'&' must sit in final-but-one position")),
        None => {
            if patterns.len() != items.len() {
                return Err(Mismatch::new(format!(
                    "expected {} values, got {} in {}",
                    patterns.len(),
                    items.len(),
                    value_preview(&Value::List(items.clone()), 40)
                )));
            }
            for (pattern, item) in patterns.iter().zip(items.iter()) {
                bind(pattern, item, bindings)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn sym(name: &str) -> Form {
        Form::symbol(name, Span::synthetic())
    }

    fn pat(items: Vec<Form>) -> Form {
        Form::list(items, Span::synthetic())
    }

    fn nums(ns: &[i64]) -> Value {
        Value::list_from(ns.iter().map(|n| Value::Int(*n)).collect())
    }

    #[test]
    fn symbol_takes_whole_value() {
        let out = destructure(&sym("x"), &nums(&[1, 2])).unwrap();
        assert_eq!(out, vec![("x".to_string(), nums(&[1, 2]))]);
    }

    #[test]
    fn positional_binding() {
        let out = destructure(&pat(vec![sym("a"), sym("b")]), &nums(&[1, 2])).unwrap();
        assert_eq!(out[0], ("a".to_string(), Value::Int(1)));
        assert_eq!(out[1], ("b".to_string(), Value::Int(2)));
    }

    #[test]
    fn nested_patterns_recurse() {
        let value = Value::list_from(vec![nums(&[1, 2]), Value::Int(3)]);
        let pattern = pat(vec![pat(vec![sym("a"), sym("b")]), sym("c")]);
        let out = destructure(&pattern, &value).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[2], ("c".to_string(), Value::Int(3)));
    }

    #[test]
    fn rest_collects_tail() {
        let pattern = pat(vec![sym("a"), sym("&"), sym("rest")]);
        let out = destructure(&pattern, &nums(&[1, 2, 3])).unwrap();
        assert_eq!(out[0], ("a".to_string(), Value::Int(1)));
        assert_eq!(out[1], ("rest".to_string(), nums(&[2, 3])));
    }

    #[test]
    fn rest_may_be_empty() {
        let pattern = pat(vec![sym("a"), sym("&"), sym("rest")]);
        let out = destructure(&pattern, &nums(&[1])).unwrap();
        assert_eq!(out[1], ("rest".to_string(), nums(&[])));
    }

    #[test]
    fn length_mismatch_signals() {
        assert!(destructure(&pat(vec![sym("a")]), &nums(&[1, 2])).is_err());
        assert!(destructure(&pat(vec![sym("a"), sym("b")]), &Value::Int(1)).is_err());
    }

    #[test]
    fn misplaced_rest_marker_rejected() {
        let pattern = pat(vec![sym("&"), sym("a"), sym("b")]);
        assert!(destructure(&pattern, &nums(&[1, 2])).is_err());
    }
}
