//! Composite schemas.
//!
//! A [`Schema`] validates and transcodes a structured record. [`ObjectSchema`]
//! is the concrete implementation: an ordered set of named fields plus
//! optional record-level validators.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::context::Context;
use crate::error::{
    Messages, Result, ValidationError, INVALID_INPUT, MISSING_REQUIRED, SCHEMA_KEY, UNKNOWN_FIELD,
};
use crate::field::Field;
use crate::partial::Partial;

/// A composite validator/transcoder for structured data.
pub trait Schema: Send + Sync + fmt::Debug {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Validate raw input and produce the loaded value.
    fn load(&self, raw: &Value, partial: &Partial, context: &Context) -> Result<Value>;

    /// Produce the serialized form of an in-memory value.
    fn dump(&self, value: &Value, context: &Context) -> Result<Value>;
}

/// What to do with input keys the schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Unknown {
    /// Report each one as a validation error.
    #[default]
    Raise,
    /// Drop them silently.
    Exclude,
}

/// Record-level validator run after every field loaded cleanly.
pub type SchemaValidator = Arc<
    dyn Fn(&Map<String, Value>, &Context) -> std::result::Result<(), ValidationError>
        + Send
        + Sync,
>;

/// A schema made of named fields.
#[derive(Clone)]
pub struct ObjectSchema {
    name: String,
    fields: IndexMap<String, Arc<dyn Field>>,
    unknown: Unknown,
    validators: Vec<SchemaValidator>,
}

impl ObjectSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            unknown: Unknown::default(),
            validators: Vec::new(),
        }
    }

    /// Declare a field. Redeclaring a name replaces the earlier field in place.
    pub fn field(self, name: impl Into<String>, field: impl Field + 'static) -> Self {
        self.field_arc(name, Arc::new(field))
    }

    pub fn field_arc(mut self, name: impl Into<String>, field: Arc<dyn Field>) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn unknown(mut self, unknown: Unknown) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Map<String, Value>, &Context) -> std::result::Result<(), ValidationError>
            + Send
            + Sync
            + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Start a new schema that inherits every field and validator of this one.
    pub fn extend(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for ObjectSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSchema")
            .field("name", &self.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("unknown", &self.unknown)
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Schema for ObjectSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, raw: &Value, partial: &Partial, context: &Context) -> Result<Value> {
        let Value::Object(input) = raw else {
            return Err(ValidationError::new(INVALID_INPUT).into());
        };

        let mut loaded = Map::new();
        let mut errors: BTreeMap<String, Messages> = BTreeMap::new();

        for (name, field) in &self.fields {
            match input.get(name) {
                None => {
                    if field.options().required && !partial.waives(name) {
                        errors.insert(name.clone(), Messages::single(MISSING_REQUIRED));
                    }
                }
                Some(value) => {
                    match field.deserialize(value, Some(name), Some(raw), &partial.descend(name)) {
                        Ok(value) => {
                            loaded.insert(name.clone(), value);
                        }
                        Err(err) => {
                            let validation = err.into_validation()?;
                            errors.insert(name.clone(), validation.into_messages());
                        }
                    }
                }
            }
        }

        if self.unknown == Unknown::Raise {
            for key in input.keys().filter(|k| !self.fields.contains_key(*k)) {
                errors.insert(key.clone(), Messages::single(UNKNOWN_FIELD));
            }
        }

        if errors.is_empty() {
            let mut schema_messages = Vec::new();
            for validator in &self.validators {
                if let Err(err) = validator(&loaded, context) {
                    schema_messages.extend(err.messages().flatten().into_iter().map(|(_, m)| m));
                }
            }
            if !schema_messages.is_empty() {
                errors.insert(SCHEMA_KEY.to_string(), Messages::List(schema_messages));
            }
        }

        if !errors.is_empty() {
            trace!(schema = %self.name, errors = errors.len(), "schema load rejected input");
            return Err(ValidationError::keyed(errors).into());
        }

        trace!(schema = %self.name, fields = loaded.len(), "schema loaded");
        Ok(Value::Object(loaded))
    }

    fn dump(&self, value: &Value, _context: &Context) -> Result<Value> {
        let Value::Object(object) = value else {
            return Err(ValidationError::new(INVALID_INPUT).into());
        };

        let mut dumped = Map::new();
        for (name, field) in &self.fields {
            if object.contains_key(name) {
                dumped.insert(name.clone(), field.serialize(name, value)?);
            }
        }
        Ok(Value::Object(dumped))
    }
}
