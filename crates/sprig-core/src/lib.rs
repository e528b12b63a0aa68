pub mod ast;
pub mod builtins;
pub mod destructure;
pub mod env;
pub mod error;
pub mod eval;
pub mod host;
pub mod printer;
pub mod reader;
pub mod runtime;

use std::path::Path;

use crate::ast::Value;
use crate::error::SprigError;
pub use crate::runtime::{EvalOptions, Interpreter};

/// Evaluate a source string in a fresh interpreter with the bundled
/// native host bridge.
pub fn eval_source(source: &str, options: Option<EvalOptions>) -> Result<Value, SprigError> {
    let options = options.unwrap_or_default();
    let source_name = options.source_name.clone();
    let interp = Interpreter::new(options)?;
    interp.eval_named(source, source_name.as_deref())
}

pub fn eval_file(path: &Path, options: Option<EvalOptions>) -> Result<Value, SprigError> {
    let interp = Interpreter::new(options.unwrap_or_default())?;
    interp.eval_file(path)
}
