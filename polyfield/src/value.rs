//! Value classes.
//!
//! Polymorphic dispatch needs to know the "class" of an in-memory value. For
//! plain JSON data that is its kind; richer data can carry a discriminator
//! key. A [`Classifier`] picks the strategy.

use serde_json::Value;

/// Class name of a JSON value's kind.
pub fn value_class(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Maps a value to the name of its class, or `None` if it has none.
pub trait Classifier: Send + Sync {
    fn classify(&self, value: &Value) -> Option<String>;
}

/// Classifies by JSON kind (`bool`, `int`, `float`, `str`, `list`, `dict`).
/// Null has no class.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonKind;

impl Classifier for JsonKind {
    fn classify(&self, value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            other => Some(value_class(other).to_string()),
        }
    }
}

/// Classifies mappings by a string discriminator key, e.g. `{"kind": "Rectangle"}`.
#[derive(Debug, Clone)]
pub struct Discriminator {
    key: String,
}

impl Discriminator {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Classifier for Discriminator {
    fn classify(&self, value: &Value) -> Option<String> {
        value
            .get(&self.key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

impl<F> Classifier for F
where
    F: Fn(&Value) -> Option<String> + Send + Sync,
{
    fn classify(&self, value: &Value) -> Option<String> {
        self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_class_names_json_kinds() {
        assert_eq!(value_class(&json!(null)), "null");
        assert_eq!(value_class(&json!(true)), "bool");
        assert_eq!(value_class(&json!(42)), "int");
        assert_eq!(value_class(&json!(-1)), "int");
        assert_eq!(value_class(&json!(3.9)), "float");
        assert_eq!(value_class(&json!("red")), "str");
        assert_eq!(value_class(&json!([1])), "list");
        assert_eq!(value_class(&json!({"puppy": 3.9})), "dict");
    }

    #[test]
    fn json_kind_has_no_class_for_null() {
        assert_eq!(JsonKind.classify(&json!(null)), None);
        assert_eq!(JsonKind.classify(&json!("red")), Some("str".into()));
    }

    #[test]
    fn discriminator_reads_string_key() {
        let classifier = Discriminator::new("kind");
        assert_eq!(
            classifier.classify(&json!({"kind": "Rectangle", "length": 4})),
            Some("Rectangle".into())
        );
        assert_eq!(classifier.classify(&json!({"kind": 3})), None);
        assert_eq!(classifier.classify(&json!("Rectangle")), None);
    }

    #[test]
    fn closures_are_classifiers() {
        let by_keys = |v: &Value| {
            if v.get("base").is_some() {
                Some("Triangle".to_string())
            } else {
                None
            }
        };
        assert_eq!(by_keys.classify(&json!({"base": 1})), Some("Triangle".into()));
        assert_eq!(by_keys.classify(&json!({"length": 1})), None);
    }
}
