//! Concrete fields for the common value kinds.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Number, Value};

use crate::context::Context;
use crate::error::{Result, ValidationError, NOT_A_LIST};
use crate::field::{Field, FieldOptions};
use crate::partial::Partial;
use crate::schema::Schema;

/// Builder setters shared by every concrete field.
macro_rules! field_options {
    ($ty:ty) => {
        impl $ty {
            /// Require the attribute to be present on load.
            pub fn required(mut self) -> Self {
                self.options = self.options.required();
                self
            }

            /// Accept null on load.
            pub fn allow_none(mut self) -> Self {
                self.options = self.options.allow_none();
                self
            }

            pub fn with_options(mut self, options: FieldOptions) -> Self {
                self.options = options;
                self
            }
        }
    };
}

fn invalid(message: &str) -> crate::error::Error {
    ValidationError::new(message).into()
}

/// A string field.
#[derive(Debug, Clone, Default)]
pub struct Str {
    options: FieldOptions,
}

impl Str {
    const INVALID: &'static str = "Not a valid string.";

    pub fn new() -> Self {
        Self::default()
    }
}

field_options!(Str);

impl Field for Str {
    fn options(&self) -> FieldOptions {
        self.options
    }

    fn deserialize_value(
        &self,
        value: &Value,
        _attr: Option<&str>,
        _parent: Option<&Value>,
        _partial: &Partial,
    ) -> Result<Value> {
        match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(invalid(Self::INVALID)),
        }
    }

    fn serialize_value(&self, value: &Value, _attr: &str, _container: &Value) -> Result<Value> {
        match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(invalid(Self::INVALID)),
        }
    }
}

/// An integer field. Accepts integral numbers and numeric strings.
#[derive(Debug, Clone, Default)]
pub struct Integer {
    options: FieldOptions,
}

// Whole floats in [-2^63, 2^63) convert to i64 exactly.
const I64_MIN: f64 = -9_223_372_036_854_775_808.0;
const I64_END: f64 = 9_223_372_036_854_775_808.0;

impl Integer {
    const INVALID: &'static str = "Not a valid integer.";

    pub fn new() -> Self {
        Self::default()
    }

    fn coerce(value: &Value) -> Result<Value> {
        let coerced = match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Value::Number(n.clone())),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && (I64_MIN..I64_END).contains(f))
                .map(|f| Value::from(f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        };
        coerced.ok_or_else(|| invalid(Self::INVALID))
    }
}

field_options!(Integer);

impl Field for Integer {
    fn options(&self) -> FieldOptions {
        self.options
    }

    fn deserialize_value(
        &self,
        value: &Value,
        _attr: Option<&str>,
        _parent: Option<&Value>,
        _partial: &Partial,
    ) -> Result<Value> {
        Self::coerce(value)
    }

    fn serialize_value(&self, value: &Value, _attr: &str, _container: &Value) -> Result<Value> {
        Self::coerce(value)
    }
}

/// A floating point field.
#[derive(Debug, Clone, Default)]
pub struct Float {
    options: FieldOptions,
}

impl Float {
    const INVALID: &'static str = "Not a valid number.";
    const NON_FINITE: &'static str = "Special numeric values (nan or infinity) are not permitted.";

    pub fn new() -> Self {
        Self::default()
    }

    fn coerce(value: &Value) -> Result<Value> {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| invalid(Self::INVALID))?;

        Number::from_f64(number)
            .map(Value::Number)
            .ok_or_else(|| invalid(Self::NON_FINITE))
    }
}

field_options!(Float);

impl Field for Float {
    fn options(&self) -> FieldOptions {
        self.options
    }

    fn deserialize_value(
        &self,
        value: &Value,
        _attr: Option<&str>,
        _parent: Option<&Value>,
        _partial: &Partial,
    ) -> Result<Value> {
        Self::coerce(value)
    }

    fn serialize_value(&self, value: &Value, _attr: &str, _container: &Value) -> Result<Value> {
        Self::coerce(value)
    }
}

/// A boolean field. Accepts the usual truthy/falsy spellings.
#[derive(Debug, Clone, Default)]
pub struct Boolean {
    options: FieldOptions,
}

impl Boolean {
    const INVALID: &'static str = "Not a valid boolean.";
    const TRUTHY: &'static [&'static str] = &["true", "t", "yes", "y", "on", "1"];
    const FALSY: &'static [&'static str] = &["false", "f", "no", "n", "off", "0"];

    pub fn new() -> Self {
        Self::default()
    }

    fn coerce(value: &Value) -> Result<Value> {
        let coerced = match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => {
                let lowered = s.to_ascii_lowercase();
                if Self::TRUTHY.contains(&lowered.as_str()) {
                    Some(true)
                } else if Self::FALSY.contains(&lowered.as_str()) {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        };
        coerced
            .map(Value::Bool)
            .ok_or_else(|| invalid(Self::INVALID))
    }
}

field_options!(Boolean);

impl Field for Boolean {
    fn options(&self) -> FieldOptions {
        self.options
    }

    fn deserialize_value(
        &self,
        value: &Value,
        _attr: Option<&str>,
        _parent: Option<&Value>,
        _partial: &Partial,
    ) -> Result<Value> {
        Self::coerce(value)
    }

    fn serialize_value(&self, value: &Value, _attr: &str, _container: &Value) -> Result<Value> {
        Self::coerce(value)
    }
}

/// A free-form mapping field.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    options: FieldOptions,
}

impl Dict {
    const INVALID: &'static str = "Not a valid mapping type.";

    pub fn new() -> Self {
        Self::default()
    }
}

field_options!(Dict);

impl Field for Dict {
    fn options(&self) -> FieldOptions {
        self.options
    }

    fn deserialize_value(
        &self,
        value: &Value,
        _attr: Option<&str>,
        _parent: Option<&Value>,
        _partial: &Partial,
    ) -> Result<Value> {
        match value {
            Value::Object(_) => Ok(value.clone()),
            _ => Err(invalid(Self::INVALID)),
        }
    }

    fn serialize_value(&self, value: &Value, _attr: &str, _container: &Value) -> Result<Value> {
        match value {
            Value::Object(_) => Ok(value.clone()),
            _ => Err(invalid(Self::INVALID)),
        }
    }
}

/// Passes any value through untouched.
#[derive(Debug, Clone, Default)]
pub struct Raw {
    options: FieldOptions,
}

impl Raw {
    pub fn new() -> Self {
        Self::default()
    }
}

field_options!(Raw);

impl Field for Raw {
    fn options(&self) -> FieldOptions {
        self.options
    }

    fn deserialize_value(
        &self,
        value: &Value,
        _attr: Option<&str>,
        _parent: Option<&Value>,
        _partial: &Partial,
    ) -> Result<Value> {
        Ok(value.clone())
    }

    fn serialize_value(&self, value: &Value, _attr: &str, _container: &Value) -> Result<Value> {
        Ok(value.clone())
    }
}

/// A homogeneous list whose elements are handled by one inner field.
#[derive(Debug, Clone)]
pub struct List {
    inner: Arc<dyn Field>,
    options: FieldOptions,
}

impl List {
    pub fn new(inner: impl Field + 'static) -> Self {
        Self::from_arc(Arc::new(inner))
    }

    pub fn from_arc(inner: Arc<dyn Field>) -> Self {
        Self {
            inner,
            options: FieldOptions::default(),
        }
    }
}

field_options!(List);

impl Field for List {
    fn options(&self) -> FieldOptions {
        self.options
    }

    fn deserialize_value(
        &self,
        value: &Value,
        attr: Option<&str>,
        parent: Option<&Value>,
        partial: &Partial,
    ) -> Result<Value> {
        let Value::Array(items) = value else {
            return Err(invalid(NOT_A_LIST));
        };

        let mut out = Vec::with_capacity(items.len());
        let mut errors = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            match self.inner.deserialize(item, attr, parent, partial) {
                Ok(loaded) => out.push(loaded),
                Err(err) => {
                    let validation = err.into_validation()?;
                    errors.insert(index.to_string(), validation.into_messages());
                }
            }
        }

        if errors.is_empty() {
            Ok(Value::Array(out))
        } else {
            Err(ValidationError::keyed(errors).into())
        }
    }

    fn serialize_value(&self, value: &Value, attr: &str, container: &Value) -> Result<Value> {
        let Value::Array(items) = value else {
            return Err(invalid(NOT_A_LIST));
        };
        items
            .iter()
            .map(|item| match item {
                Value::Null => Ok(Value::Null),
                item => self.inner.serialize_value(item, attr, container),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

/// Embeds a schema as a field.
#[derive(Debug, Clone)]
pub struct Nested {
    schema: Arc<dyn Schema>,
    context: Context,
    options: FieldOptions,
}

impl Nested {
    pub fn new(schema: impl Schema + 'static) -> Self {
        Self::from_arc(Arc::new(schema))
    }

    pub fn from_arc(schema: Arc<dyn Schema>) -> Self {
        Self {
            schema,
            context: Context::default(),
            options: FieldOptions::default(),
        }
    }

    /// Context handed to the nested schema on every load and dump.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn schema(&self) -> &Arc<dyn Schema> {
        &self.schema
    }
}

field_options!(Nested);

impl Field for Nested {
    fn options(&self) -> FieldOptions {
        self.options
    }

    fn deserialize_value(
        &self,
        value: &Value,
        _attr: Option<&str>,
        _parent: Option<&Value>,
        partial: &Partial,
    ) -> Result<Value> {
        self.schema.load(value, partial, &self.context)
    }

    fn serialize_value(&self, value: &Value, _attr: &str, _container: &Value) -> Result<Value> {
        self.schema.dump(value, &self.context)
    }
}
