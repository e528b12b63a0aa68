use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ast::Value;

pub type EnvRef = Arc<RwLock<Env>>;

/// One scope in the environment chain. Lookup walks outward through
/// `outer`; the root scope (no outer) holds builtins and everything bound
/// by `def`/`defn`/`defmacro`/`pyimport`.
#[derive(Debug, Default)]
pub struct Env {
    data: HashMap<String, Value>,
    outer: Option<EnvRef>,
}

impl Env {
    pub fn new_child(outer: EnvRef) -> Self {
        Self {
            data: HashMap::new(),
            outer: Some(outer),
        }
    }

    /// Bind in this scope. A second binding of the same name overwrites
    /// the first (sequential `let` pairs rely on this).
    pub fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn define_builtin(&mut self, key: &str, value: Value) {
        self.set(key, value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.data.get(key) {
            return Some(v.clone());
        }
        if let Some(ref outer) = self.outer {
            return outer.read().unwrap().get(key);
        }
        None
    }

    pub fn contains_local(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn outer_ref(&self) -> Option<EnvRef> {
        self.outer.clone()
    }
}

pub fn new_ref(env: Env) -> EnvRef {
    Arc::new(RwLock::new(env))
}

/// Walk to the outermost scope of a chain.
pub fn root_of(env: &EnvRef) -> EnvRef {
    let mut current = env.clone();
    loop {
        let outer = current.read().unwrap().outer_ref();
        match outer {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

/// Bind in the root scope regardless of how deep the caller is. This is
/// the `def` family's semantics and permits redefining builtins.
pub fn define_root(env: &EnvRef, key: &str, value: Value) {
    let root = root_of(env);
    root.write().unwrap().set(key, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_binding_wins() {
        let root = new_ref(Env::default());
        root.write().unwrap().set("x", Value::Int(1));
        let child = new_ref(Env::new_child(root.clone()));
        assert_eq!(child.read().unwrap().get("x"), Some(Value::Int(1)));
        child.write().unwrap().set("x", Value::Int(2));
        assert_eq!(child.read().unwrap().get("x"), Some(Value::Int(2)));
        assert_eq!(root.read().unwrap().get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn define_root_skips_intermediate_scopes() {
        let root = new_ref(Env::default());
        let mid = new_ref(Env::new_child(root.clone()));
        let leaf = new_ref(Env::new_child(mid.clone()));
        define_root(&leaf, "y", Value::Int(7));
        assert!(!mid.read().unwrap().contains_local("y"));
        assert_eq!(root.read().unwrap().get("y"), Some(Value::Int(7)));
        assert_eq!(leaf.read().unwrap().get("y"), Some(Value::Int(7)));
    }
}
