//! The generic field contract.
//!
//! Every field, polymorphic or not, is driven through the same two entry
//! points: [`Field::deserialize`] for raw input and [`Field::serialize`] for an
//! attribute of an in-memory container. The provided methods handle null and
//! attribute extraction; implementers supply the value-level conversions.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ValidationError, NULL_NOT_ALLOWED};
use crate::partial::Partial;

/// Options shared by every field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptions {
    /// The attribute must be present in the input.
    #[serde(default)]
    pub required: bool,
    /// Null is accepted and passed through.
    #[serde(default)]
    pub allow_none: bool,
}

impl FieldOptions {
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allow_none(mut self) -> Self {
        self.allow_none = true;
        self
    }
}

/// A single-value validator/transcoder.
pub trait Field: Send + Sync + fmt::Debug {
    fn options(&self) -> FieldOptions {
        FieldOptions::default()
    }

    /// Convert a non-null raw value.
    ///
    /// `attr` is the attribute name being loaded and `parent` the enclosing raw
    /// mapping, when there is one.
    fn deserialize_value(
        &self,
        value: &Value,
        attr: Option<&str>,
        parent: Option<&Value>,
        partial: &Partial,
    ) -> Result<Value>;

    /// Convert a non-null in-memory value read from `container[attr]`.
    fn serialize_value(&self, value: &Value, attr: &str, container: &Value) -> Result<Value>;

    /// Deserialize a raw value, applying null handling first.
    fn deserialize(
        &self,
        value: &Value,
        attr: Option<&str>,
        parent: Option<&Value>,
        partial: &Partial,
    ) -> Result<Value> {
        if value.is_null() {
            return if self.options().allow_none {
                Ok(Value::Null)
            } else {
                Err(ValidationError::new(NULL_NOT_ALLOWED).into())
            };
        }
        self.deserialize_value(value, attr, parent, partial)
    }

    /// Serialize `container[attr]`. Absent and null attributes produce null.
    fn serialize(&self, attr: &str, container: &Value) -> Result<Value> {
        match container.get(attr) {
            None | Some(Value::Null) => Ok(Value::Null),
            Some(value) => self.serialize_value(value, attr, container),
        }
    }
}
