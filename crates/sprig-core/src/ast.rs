use std::fmt;
use std::sync::Arc;

use im::Vector;

use crate::env::EnvRef;
use crate::error::SprigError;
use crate::host::HostObject;

/// Position of a form in its source text. `index` is the absolute
/// character offset; `line` and `col` are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
    pub index: usize,
}

impl Span {
    pub fn new(line: usize, col: usize, index: usize) -> Self {
        Self { line, col, index }
    }

    /// Span for forms the evaluator manufactures itself (macro output,
    /// synthesized parameter lists). Line 0 never appears in real source.
    pub fn synthetic() -> Self {
        Self {
            line: 0,
            col: 0,
            index: 0,
        }
    }
}

/// A parsed source expression. Immutable after parsing; the evaluator
/// only ever clones forms, never mutates them.
#[derive(Clone, Debug, PartialEq)]
pub struct Form {
    pub kind: FormKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormKind {
    Symbol(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Nil,
    List(Vec<Form>),
    /// `'x`: inert until evaluated, then carried as data.
    Quoted(Box<Form>),
    /// `~x`: escape back into evaluation inside a quoted context.
    Unquoted(Box<Form>),
}

impl Form {
    pub fn new(kind: FormKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn symbol(name: impl Into<String>, span: Span) -> Self {
        Self::new(FormKind::Symbol(name.into()), span)
    }

    pub fn list(items: Vec<Form>, span: Span) -> Self {
        Self::new(FormKind::List(items), span)
    }

    pub fn symbol_name(&self) -> Option<&str> {
        match &self.kind {
            FormKind::Symbol(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn list_items(&self) -> Option<&[Form]> {
        match &self.kind {
            FormKind::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Minimum/maximum accepted argument counts for a native function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FnArity {
    min: usize,
    max: Option<usize>,
}

impl FnArity {
    pub fn exact(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    pub fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }

    pub fn describe(&self) -> String {
        match (self.min, self.max) {
            (min, Some(max)) if min == max => format!("{}", min),
            (min, Some(max)) => format!("{}..{}", min, max),
            (min, None) => format!("at least {}", min),
        }
    }
}

/// A builtin implemented in Rust. Plays the HostCallable role: it has no
/// captured environment and is applied directly by the engine.
pub struct NativeFn {
    name: String,
    arity: FnArity,
    func: Box<dyn Fn(&[Value]) -> Result<Value, SprigError> + Send + Sync>,
}

impl NativeFn {
    pub fn new(
        name: impl Into<String>,
        arity: FnArity,
        func: impl Fn(&[Value]) -> Result<Value, SprigError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            func: Box::new(func),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, SprigError> {
        (self.func)(args)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> FnArity {
        self.arity
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

/// A user-defined function or macro: parameter pattern, body forms, and
/// the environment captured at the definition site.
#[derive(Debug)]
pub struct LambdaData {
    pub name: Option<String>,
    pub params: Form,
    pub body: Vec<Form>,
    pub env: EnvRef,
    pub is_macro: bool,
}

impl LambdaData {
    pub fn describe(&self) -> String {
        let kind = if self.is_macro { "macro" } else { "fn" };
        match &self.name {
            Some(name) => format!("<{} {}>", kind, name),
            None => format!("<{}>", kind),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A symbol carried as data (quoted code, macro input/output).
    Symbol(String),
    List(Vector<Value>),
    Lambda(Arc<LambdaData>),
    Native(Arc<NativeFn>),
    Host(HostObject),
}

impl Value {
    pub fn native(
        name: impl Into<String>,
        arity: FnArity,
        func: impl Fn(&[Value]) -> Result<Value, SprigError> + Send + Sync + 'static,
    ) -> Value {
        Value::Native(Arc::new(NativeFn::new(name, arity, func)))
    }

    pub fn list_from(items: Vec<Value>) -> Value {
        Value::List(Vector::from(items))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Lambda(data) if data.is_macro => "macro",
            Value::Lambda(_) => "function",
            Value::Native(_) => "builtin",
            Value::Host(_) => "host object",
        }
    }

    /// Truthiness for everything the core can decide on its own: only
    /// `None` and `false` are falsy. Host objects are delegated to the
    /// bridge by the engine; here they count as truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Lambda(a), Value::Lambda(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => a == b,
            _ => false,
        }
    }
}

/// Convert a form into its data representation. Quote and unquote nodes
/// survive as `(quote x)` / `(unquote x)` lists so the result can be
/// handed back to the evaluator unchanged in meaning.
pub fn form_to_value(form: &Form) -> Value {
    match &form.kind {
        FormKind::Symbol(name) => Value::Symbol(name.clone()),
        FormKind::Int(n) => Value::Int(*n),
        FormKind::Float(n) => Value::Float(*n),
        FormKind::Str(s) => Value::Str(s.clone()),
        FormKind::Bool(b) => Value::Bool(*b),
        FormKind::Nil => Value::Nil,
        FormKind::List(items) => Value::List(items.iter().map(form_to_value).collect()),
        FormKind::Quoted(inner) => Value::List(
            [Value::Symbol("quote".to_string()), form_to_value(inner)]
                .into_iter()
                .collect(),
        ),
        FormKind::Unquoted(inner) => Value::List(
            [Value::Symbol("unquote".to_string()), form_to_value(inner)]
                .into_iter()
                .collect(),
        ),
    }
}

/// Convert data back into an evaluatable form. Macro results pass through
/// here before re-entering the engine. Functions and host objects have no
/// source representation, so they cannot appear in code.
pub fn value_to_form(value: &Value) -> Result<Form, SprigError> {
    let span = Span::synthetic();
    let kind = match value {
        Value::Nil => FormKind::Nil,
        Value::Bool(b) => FormKind::Bool(*b),
        Value::Int(n) => FormKind::Int(*n),
        Value::Float(n) => FormKind::Float(*n),
        Value::Str(s) => FormKind::Str(s.clone()),
        Value::Symbol(name) => FormKind::Symbol(name.clone()),
        Value::List(items) => {
            let mut forms = Vec::with_capacity(items.len());
            for item in items {
                forms.push(value_to_form(item)?);
            }
            FormKind::List(forms)
        }
        other => {
            return Err(SprigError::type_mismatch("a code form", other.type_name()));
        }
    };
    Ok(Form::new(kind, span))
}
