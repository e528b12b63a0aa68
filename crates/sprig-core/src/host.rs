use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::{FnArity, Value};
use crate::error::SprigError;

/// Opaque handle to something that lives on the host side of the bridge.
/// Attribute access and calls go back through the `HostBridge`; equality
/// is identity, never structure.
#[derive(Clone)]
pub struct HostObject {
    pub tag: String,
    pub data: Arc<dyn Any + Send + Sync>,
}

impl HostObject {
    pub fn new(tag: impl Into<String>, data: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            tag: tag.into(),
            data,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<host {}>", self.tag)
    }
}

/// The narrow interface the evaluator requires from its embedder. All
/// four operations may fail; failures surface as the `Host` error kind.
/// The surface language has no kwargs syntax today, so `kwargs` is
/// always empty when the engine calls in.
pub trait HostBridge: Send + Sync {
    fn import_module(&self, dotted_name: &str) -> Result<Value, SprigError>;

    fn get_attr(&self, obj: &HostObject, name: &str) -> Result<Value, SprigError>;

    fn call(
        &self,
        obj: &HostObject,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> Result<Value, SprigError>;

    fn is_truthy(&self, obj: &HostObject) -> bool;
}

/// A host module implemented in Rust: a named bag of attributes whose
/// callables are ordinary native functions.
pub struct NativeModule {
    name: String,
    attrs: HashMap<String, Value>,
}

impl NativeModule {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: HashMap::new(),
        }
    }

    fn attr(mut self, name: &str, value: Value) -> Self {
        self.attrs.insert(name.to_string(), value);
        self
    }

    fn func(
        self,
        name: &str,
        arity: FnArity,
        func: impl Fn(&[Value]) -> Result<Value, SprigError> + Send + Sync + 'static,
    ) -> Self {
        let value = Value::native(name, arity, func);
        self.attr(name, value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.attrs.get(name).cloned()
    }
}

/// The bundled bridge: a registry of Rust-implemented host modules, so
/// `pyimport`, `.`, and dotted symbols work end-to-end without linking a
/// foreign runtime. Embedders with a real host runtime supply their own
/// `HostBridge` instead.
pub struct NativeHost {
    modules: HashMap<String, Arc<NativeModule>>,
}

impl NativeHost {
    pub fn new() -> Self {
        let mut host = Self {
            modules: HashMap::new(),
        };
        host.register(math_module());
        host.register(strings_module());
        host
    }

    pub fn register(&mut self, module: NativeModule) {
        self.modules
            .insert(module.name.clone(), Arc::new(module));
    }
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBridge for NativeHost {
    fn import_module(&self, dotted_name: &str) -> Result<Value, SprigError> {
        match self.modules.get(dotted_name) {
            Some(module) => Ok(Value::Host(HostObject::new(
                format!("module {}", module.name),
                module.clone(),
            ))),
            None => Err(SprigError::host(format!(
                "no host module named '{}'",
                dotted_name
            ))),
        }
    }

    fn get_attr(&self, obj: &HostObject, name: &str) -> Result<Value, SprigError> {
        let Some(module) = obj.downcast_ref::<NativeModule>() else {
            return Err(SprigError::host(format!(
                "{:?} has no attributes",
                obj
            )));
        };
        module.get(name).ok_or_else(|| {
            SprigError::host(format!(
                "module '{}' has no attribute '{}'",
                module.name, name
            ))
        })
    }

    fn call(
        &self,
        obj: &HostObject,
        _args: &[Value],
        _kwargs: &[(String, Value)],
    ) -> Result<Value, SprigError> {
        // Module attributes are native functions the engine applies
        // directly; the handles themselves are never callable.
        Err(SprigError::host(format!("{:?} is not callable", obj)))
    }

    fn is_truthy(&self, _obj: &HostObject) -> bool {
        true
    }
}

fn number_arg(name: &str, args: &[Value], idx: usize) -> Result<f64, SprigError> {
    match &args[idx] {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(n) => Ok(*n),
        other => Err(SprigError::type_mismatch(
            format!("number (argument {} of {})", idx + 1, name),
            other.type_name(),
        )),
    }
}

fn math_module() -> NativeModule {
    NativeModule::new("math")
        .attr("pi", Value::Float(std::f64::consts::PI))
        .attr("e", Value::Float(std::f64::consts::E))
        .func("sqrt", FnArity::exact(1), |args| {
            let n = number_arg("sqrt", args, 0)?;
            if n < 0.0 {
                return Err(SprigError::host("sqrt of a negative number"));
            }
            Ok(Value::Float(n.sqrt()))
        })
        .func("floor", FnArity::exact(1), |args| {
            Ok(Value::Int(number_arg("floor", args, 0)?.floor() as i64))
        })
        .func("ceil", FnArity::exact(1), |args| {
            Ok(Value::Int(number_arg("ceil", args, 0)?.ceil() as i64))
        })
        .func("abs", FnArity::exact(1), |args| match &args[0] {
            Value::Int(n) => Ok(Value::Int(n.abs())),
            Value::Float(n) => Ok(Value::Float(n.abs())),
            other => Err(SprigError::type_mismatch("number", other.type_name())),
        })
        .func("pow", FnArity::exact(2), |args| {
            let base = number_arg("pow", args, 0)?;
            let exp = number_arg("pow", args, 1)?;
            let out = base.powf(exp);
            if let (Value::Int(_), Value::Int(e)) = (&args[0], &args[1]) {
                if *e >= 0 && out.fract() == 0.0 && out.abs() < i64::MAX as f64 {
                    return Ok(Value::Int(out as i64));
                }
            }
            Ok(Value::Float(out))
        })
}

fn string_arg(name: &str, args: &[Value], idx: usize) -> Result<String, SprigError> {
    match &args[idx] {
        Value::Str(s) => Ok(s.clone()),
        other => Err(SprigError::type_mismatch(
            format!("string (argument {} of {})", idx + 1, name),
            other.type_name(),
        )),
    }
}

fn strings_module() -> NativeModule {
    NativeModule::new("strings")
        .func("upper", FnArity::exact(1), |args| {
            Ok(Value::Str(string_arg("upper", args, 0)?.to_uppercase()))
        })
        .func("lower", FnArity::exact(1), |args| {
            Ok(Value::Str(string_arg("lower", args, 0)?.to_lowercase()))
        })
        .func("trim", FnArity::exact(1), |args| {
            Ok(Value::Str(string_arg("trim", args, 0)?.trim().to_string()))
        })
        .func("split", FnArity::exact(2), |args| {
            let text = string_arg("split", args, 0)?;
            let sep = string_arg("split", args, 1)?;
            let parts: Vec<Value> = text
                .split(sep.as_str())
                .map(|part| Value::Str(part.to_string()))
                .collect();
            Ok(Value::list_from(parts))
        })
        .func("join", FnArity::exact(2), |args| {
            let sep = string_arg("join", args, 0)?;
            let Value::List(items) = &args[1] else {
                return Err(SprigError::type_mismatch("list", args[1].type_name()));
            };
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(s) => parts.push(s.clone()),
                    other => parts.push(other.to_string()),
                }
            }
            Ok(Value::Str(parts.join(&sep)))
        })
}
