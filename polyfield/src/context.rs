//! Ambient context threaded into nested schemas.
//!
//! A `Context` is an immutable string-keyed map. It is bound to a field when
//! the field is built and passed explicitly to every schema the field
//! delegates to, so nested schemas observe the same request-scoped settings
//! as the enclosing one. Cloning is cheap; updates return a new map.

use std::sync::Arc;

use serde_json::{Map, Value};

/// Read-only key/value context handed to schema loads and dumps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: Arc<Map<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a context with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        Arc::make_mut(&mut self.values).insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
