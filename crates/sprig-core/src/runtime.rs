use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::ast::{Form, Value};
use crate::builtins;
use crate::env::{new_ref, Env, EnvRef};
use crate::error::SprigError;
use crate::eval::Evaluator;
use crate::host::{HostBridge, NativeHost};
use crate::reader::parse_source;

const STD_SOURCE: &str = include_str!("../assets/sprig_std.spg");

#[derive(Clone, Debug, Default)]
pub struct EvalOptions {
    /// Skip the standard-library bootstrap (bare builtins only).
    pub no_std: bool,
    /// Name used in error locations when evaluating anonymous source.
    pub source_name: Option<String>,
}

/// A root environment, its evaluator, and the bridge they talk through.
/// Construction installs the native builtins and evaluates the standard
/// library against the fresh root.
pub struct Interpreter {
    root: EnvRef,
    evaluator: Evaluator,
}

impl Interpreter {
    pub fn new(options: EvalOptions) -> Result<Self, SprigError> {
        Self::with_bridge(Arc::new(NativeHost::new()), options)
    }

    pub fn with_bridge(
        bridge: Arc<dyn HostBridge>,
        options: EvalOptions,
    ) -> Result<Self, SprigError> {
        let mut env = Env::default();
        builtins::install_core(&mut env);
        let interp = Self {
            root: new_ref(env),
            evaluator: Evaluator::new(bridge),
        };
        if !options.no_std {
            interp.eval_named(STD_SOURCE, Some("<std>"))?;
        }
        Ok(interp)
    }

    pub fn root_env(&self) -> EnvRef {
        self.root.clone()
    }

    pub fn eval_source(&self, source: &str) -> Result<Value, SprigError> {
        self.eval_named(source, None)
    }

    pub fn eval_named(&self, source: &str, name: Option<&str>) -> Result<Value, SprigError> {
        let forms = parse_source(source, name)?;
        self.eval_forms(&forms)
            .map_err(|err| err.with_file(name.map(String::from)))
    }

    /// A program is a sequence of forms evaluated in order; its value is
    /// the last form's value.
    pub fn eval_forms(&self, forms: &[Form]) -> Result<Value, SprigError> {
        let mut result = Value::Nil;
        for form in forms {
            result = self.evaluator.eval(form, self.root.clone())?;
        }
        Ok(result)
    }

    pub fn eval_file(&self, path: &Path) -> Result<Value, SprigError> {
        let name = path.display().to_string();
        let source = fs::read_to_string(path)
            .map_err(|err| SprigError::runtime(format!("cannot read {}: {}", name, err)))?;
        self.eval_named(&source, Some(&name))
    }
}
