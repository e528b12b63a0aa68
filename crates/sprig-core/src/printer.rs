use std::fmt;

use crate::ast::{Form, FormKind, Value};

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            // {:?} keeps the trailing ".0" so floats stay visually
            // distinct from ints.
            Value::Float(n) => write!(f, "{:?}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Symbol(name) => write!(f, "{}", name),
            Value::List(items) => {
                write!(f, "(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Lambda(data) => write!(f, "{}", data.describe()),
            Value::Native(native) => write!(f, "<builtin {}>", native.name()),
            Value::Host(obj) => write!(f, "{:?}", obj),
        }
    }
}

pub fn form_to_string(form: &Form) -> String {
    render_form(form, usize::MAX)
}

/// Render a form for a trace line: lists nested deeper than `depth`
/// collapse to `(...)`.
pub fn form_to_string_elided(form: &Form, depth: usize) -> String {
    render_form(form, depth)
}

fn render_form(form: &Form, depth: usize) -> String {
    match &form.kind {
        FormKind::Symbol(name) => name.clone(),
        FormKind::Int(n) => n.to_string(),
        FormKind::Float(n) => format!("{:?}", n),
        FormKind::Str(s) => format!("{:?}", s),
        FormKind::Bool(b) => b.to_string(),
        FormKind::Nil => "None".to_string(),
        FormKind::Quoted(inner) => format!("'{}", render_form(inner, depth)),
        FormKind::Unquoted(inner) => format!("~{}", render_form(inner, depth)),
        FormKind::List(items) => {
            if depth == 0 {
                return "(...)".to_string();
            }
            let parts: Vec<String> = items
                .iter()
                .map(|item| render_form(item, depth.saturating_sub(1)))
                .collect();
            format!("({})", parts.join(" "))
        }
    }
}

/// Short rendering of a value for error messages and call-frame
/// snapshots; long values are cut off so traces stay one line per frame.
pub fn value_preview(value: &Value, max_len: usize) -> String {
    let mut text = match value {
        Value::Str(s) => format!("{:?}", s),
        other => other.to_string(),
    };
    if text.chars().count() > max_len {
        text = text.chars().take(max_len).collect::<String>() + "...";
    }
    text
}
