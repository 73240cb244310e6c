//! Per-run execution context: the binding table procedures evaluate against.
//!
//! A [`Context`] is constructed fresh for every calculation run and discarded
//! afterwards; it is never shared between runs. It starts out holding the
//! coerced QA input values, the library handles, and the upload map, and
//! accumulates one extra binding per successfully evaluated procedure so
//! that downstream procedures can reference upstream results by slug.

use indexmap::IndexMap;

use crate::value::Value;

/// Mutable name-to-value binding table scoped to one calculation run.
///
/// Insertion order is preserved, which keeps diagnostics and serialized
/// dumps deterministic for identical inputs.
#[derive(Debug, Clone, Default)]
pub struct Context {
    bindings: IndexMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// Binds `name` to `value`, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Looks up a binding by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Removes a binding, returning its value if it was present.
    pub fn unbind(&mut self, name: &str) -> Option<Value> {
        self.bindings.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.bindings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_get_unbind_roundtrip() {
        let mut ctx = Context::new();
        ctx.bind("dose", Value::Number(2.0));
        assert_eq!(ctx.get("dose"), Some(&Value::Number(2.0)));
        assert_eq!(ctx.unbind("dose"), Some(Value::Number(2.0)));
        assert_eq!(ctx.get("dose"), None);
    }

    #[test]
    fn rebind_replaces() {
        let mut ctx = Context::new();
        ctx.bind("x", Value::Number(1.0));
        ctx.bind("x", Value::Number(2.0));
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.get("x"), Some(&Value::Number(2.0)));
    }
}
