use std::fmt;

use thiserror::Error;

use crate::ast::Span;

pub const ERROR_TAG: &str = "\x1b[31m[ERROR]\x1b[0m";

/// One line of the call trace: the rendered form plus, for function-body
/// frames, the callee name and bound parameter snapshot.
#[derive(Clone, Debug)]
pub struct TraceFrame {
    pub text: String,
    pub context: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ErrorContext {
    pub span: Option<Span>,
    pub file: Option<String>,
    pub trace: Vec<TraceFrame>,
}

impl ErrorContext {
    fn set_span(&mut self, span: Span) {
        if self.span.is_none() {
            self.span = Some(span);
        }
    }

    fn set_file(&mut self, file: Option<String>) {
        if self.file.is_none() {
            self.file = file;
        }
    }

    fn set_trace(&mut self, trace: Vec<TraceFrame>) {
        if self.trace.is_empty() && !trace.is_empty() {
            self.trace = trace;
        }
    }
}

#[derive(Clone, Debug)]
pub struct ErrorData {
    pub message: String,
    pub context: ErrorContext,
}

impl ErrorData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }
}

impl fmt::Display for ErrorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Error, Debug, Clone)]
pub enum SprigError {
    #[error("Parse error: {0}")]
    Parse(ErrorData),

    #[error("Name error: {0}")]
    UnboundSymbol(ErrorData),

    #[error("Not callable: {0}")]
    NotCallable(ErrorData),

    #[error("Arity mismatch: {0}")]
    Arity(ErrorData),

    #[error("Match error: {0}")]
    NoMatch(ErrorData),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: String,
        actual: String,
        context: ErrorContext,
    },

    #[error("Host error: {0}")]
    Host(ErrorData),

    #[error("Internal error: {0}")]
    Internal(ErrorData),

    #[error("Runtime error: {0}")]
    Runtime(ErrorData),
}

impl SprigError {
    pub fn parse(message: impl Into<String>) -> Self {
        SprigError::Parse(ErrorData::new(message))
    }

    pub fn unbound_symbol(name: &str) -> Self {
        SprigError::UnboundSymbol(ErrorData::new(format!("'{}' is not bound", name)))
    }

    pub fn not_callable(message: impl Into<String>) -> Self {
        SprigError::NotCallable(ErrorData::new(message))
    }

    pub fn arity(message: impl Into<String>) -> Self {
        SprigError::Arity(ErrorData::new(message))
    }

    pub fn no_match(message: impl Into<String>) -> Self {
        SprigError::NoMatch(ErrorData::new(message))
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        SprigError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn host(message: impl Into<String>) -> Self {
        SprigError::Host(ErrorData::new(message))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SprigError::Internal(ErrorData::new(message))
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        SprigError::Runtime(ErrorData::new(message))
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.context_mut().set_span(span);
        self
    }

    pub fn with_file(mut self, file: Option<String>) -> Self {
        self.context_mut().set_file(file);
        self
    }

    pub fn with_trace(mut self, trace: Vec<TraceFrame>) -> Self {
        self.context_mut().set_trace(trace);
        self
    }

    pub fn span(&self) -> Option<Span> {
        self.context_ref().span
    }

    pub fn file(&self) -> Option<&str> {
        self.context_ref().file.as_deref()
    }

    pub fn trace(&self) -> &[TraceFrame] {
        &self.context_ref().trace
    }

    fn context_ref(&self) -> &ErrorContext {
        match self {
            SprigError::Parse(data)
            | SprigError::UnboundSymbol(data)
            | SprigError::NotCallable(data)
            | SprigError::Arity(data)
            | SprigError::NoMatch(data)
            | SprigError::Host(data)
            | SprigError::Internal(data)
            | SprigError::Runtime(data) => &data.context,
            SprigError::TypeMismatch { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            SprigError::Parse(data)
            | SprigError::UnboundSymbol(data)
            | SprigError::NotCallable(data)
            | SprigError::Arity(data)
            | SprigError::NoMatch(data)
            | SprigError::Host(data)
            | SprigError::Internal(data)
            | SprigError::Runtime(data) => &mut data.context,
            SprigError::TypeMismatch { context, .. } => context,
        }
    }
}

/// Render an error for the terminal: the tagged message, the source
/// location when known, and the call trace root-to-leaf with the deepest
/// frame singled out.
pub fn format_error(err: &SprigError) -> Vec<String> {
    let mut lines = vec![format!("{} {}", ERROR_TAG, err)];
    if let Some(location) = format_location(err.file(), err.span()) {
        lines.push(format!("  at {}", location));
    }
    let trace = err.trace();
    if !trace.is_empty() {
        lines.push("Call trace (outermost first):".to_string());
        for (idx, frame) in trace.iter().enumerate() {
            if idx + 1 == trace.len() {
                lines.push("Exception happened here:".to_string());
            }
            match &frame.context {
                Some(context) => lines.push(format!("  {}  [in {}]", frame.text, context)),
                None => lines.push(format!("  {}", frame.text)),
            }
        }
    }
    lines
}

fn format_location(file: Option<&str>, span: Option<Span>) -> Option<String> {
    match (file, span) {
        (Some(file), Some(span)) => Some(format!("{}:{}:{}", file, span.line, span.col)),
        (None, Some(span)) => Some(format!("line {}, column {}", span.line, span.col)),
        (Some(file), None) => Some(file.to_string()),
        (None, None) => None,
    }
}
