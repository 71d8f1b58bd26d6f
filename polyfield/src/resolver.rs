//! The schema resolution contract.
//!
//! A [`SchemaResolver`] decides, per value, which schema or field handles it.
//! Selectors return a [`Selection`], which is deliberately loose: an instance,
//! a class to instantiate, or something unusable. [`ResolvedTarget::resolve`]
//! is the single place that turns a selection into a usable target.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::error::{Error, ValidationError};
use crate::field::Field;
use crate::schema::Schema;
use crate::value::value_class;

/// Errors a selector or modifier may raise.
#[derive(Debug, Error)]
pub enum SelectorError {
    /// The input is invalid; reported to the caller verbatim.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// This direction is not supported by the resolver.
    #[error("{operation} is not implemented")]
    NotImplemented { operation: &'static str },

    /// The selector could not make a choice.
    #[error("{0}")]
    Failed(String),
}

impl SelectorError {
    pub fn failed(message: impl Into<String>) -> Self {
        SelectorError::Failed(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        SelectorError::Invalid(ValidationError::new(message))
    }

    pub fn not_implemented(operation: &'static str) -> Self {
        SelectorError::NotImplemented { operation }
    }
}

impl From<SelectorError> for Error {
    fn from(err: SelectorError) -> Self {
        match err {
            SelectorError::Invalid(validation) => Error::Validation(validation),
            SelectorError::NotImplemented { operation } => Error::NotImplemented { operation },
            SelectorError::Failed(message) => Error::Validation(ValidationError::new(message)),
        }
    }
}

pub type SelectorResult<T> = std::result::Result<T, SelectorError>;

type SchemaConstructor =
    Arc<dyn Fn() -> std::result::Result<Arc<dyn Schema>, String> + Send + Sync>;
type FieldConstructor = Arc<dyn Fn() -> std::result::Result<Arc<dyn Field>, String> + Send + Sync>;

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A named schema constructor, the analogue of returning a schema class.
#[derive(Clone)]
pub struct SchemaClass {
    name: Cow<'static, str>,
    construct: SchemaConstructor,
}

impl SchemaClass {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, construct: F) -> Self
    where
        F: Fn() -> std::result::Result<Arc<dyn Schema>, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            construct: Arc::new(construct),
        }
    }

    /// The class of a default-constructible schema type.
    pub fn of<S: Schema + Default + 'static>() -> Self {
        Self::new(short_type_name::<S>(), || Ok(Arc::new(S::default()) as Arc<dyn Schema>))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self) -> std::result::Result<Arc<dyn Schema>, String> {
        (self.construct)()
    }
}

impl fmt::Debug for SchemaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemaClass").field(&self.name).finish()
    }
}

/// A named field constructor, the analogue of returning a field class.
#[derive(Clone)]
pub struct FieldClass {
    name: Cow<'static, str>,
    construct: FieldConstructor,
}

impl FieldClass {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, construct: F) -> Self
    where
        F: Fn() -> std::result::Result<Arc<dyn Field>, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            construct: Arc::new(construct),
        }
    }

    /// The class of a default-constructible field type.
    pub fn of<T: Field + Default + 'static>() -> Self {
        Self::new(short_type_name::<T>(), || Ok(Arc::new(T::default()) as Arc<dyn Field>))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self) -> std::result::Result<Arc<dyn Field>, String> {
        (self.construct)()
    }
}

impl fmt::Debug for FieldClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldClass").field(&self.name).finish()
    }
}

/// Whatever a selector produced.
#[derive(Debug, Clone)]
pub enum Selection {
    Schema(Arc<dyn Schema>),
    Field(Arc<dyn Field>),
    SchemaClass(SchemaClass),
    FieldClass(FieldClass),
    /// A plain value; never usable as a target.
    Value(Value),
    /// The selector had no answer.
    Nothing,
}

impl Selection {
    pub fn schema(schema: impl Schema + 'static) -> Self {
        Selection::Schema(Arc::new(schema))
    }

    pub fn field(field: impl Field + 'static) -> Self {
        Selection::Field(Arc::new(field))
    }

    /// Class name of what was produced, for diagnostics.
    pub fn class_name(&self) -> String {
        match self {
            Selection::Schema(schema) => format!("schema {}", schema.name()),
            Selection::Field(field) => format!("field {field:?}"),
            Selection::SchemaClass(class) => format!("schema class {}", class.name()),
            Selection::FieldClass(class) => format!("field class {}", class.name()),
            Selection::Value(value) => value_class(value).to_string(),
            Selection::Nothing => "None".to_string(),
        }
    }
}

impl From<SchemaClass> for Selection {
    fn from(class: SchemaClass) -> Self {
        Selection::SchemaClass(class)
    }
}

impl From<FieldClass> for Selection {
    fn from(class: FieldClass) -> Self {
        Selection::FieldClass(class)
    }
}

impl From<Arc<dyn Schema>> for Selection {
    fn from(schema: Arc<dyn Schema>) -> Self {
        Selection::Schema(schema)
    }
}

impl From<Arc<dyn Field>> for Selection {
    fn from(field: Arc<dyn Field>) -> Self {
        Selection::Field(field)
    }
}

impl From<ResolvedTarget> for Selection {
    fn from(target: ResolvedTarget) -> Self {
        match target {
            ResolvedTarget::Schema(schema) => Selection::Schema(schema),
            ResolvedTarget::Field(field) => Selection::Field(field),
        }
    }
}

/// A selection that could not be turned into a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// Class of what the selector produced.
    pub produced: String,
    pub reason: String,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (got {})", self.reason, self.produced)
    }
}

/// A usable delegate.
#[derive(Debug, Clone)]
pub enum ResolvedTarget {
    Schema(Arc<dyn Schema>),
    Field(Arc<dyn Field>),
}

impl ResolvedTarget {
    /// Normalize a selection: pass instances through, instantiate classes,
    /// reject everything else.
    pub fn resolve(selection: Selection) -> std::result::Result<Self, Unresolved> {
        let produced = selection.class_name();
        match selection {
            Selection::Schema(schema) => Ok(ResolvedTarget::Schema(schema)),
            Selection::Field(field) => Ok(ResolvedTarget::Field(field)),
            Selection::SchemaClass(class) => class
                .instantiate()
                .map(ResolvedTarget::Schema)
                .map_err(|reason| Unresolved {
                    produced,
                    reason: format!("could not instantiate: {reason}"),
                }),
            Selection::FieldClass(class) => class
                .instantiate()
                .map(ResolvedTarget::Field)
                .map_err(|reason| Unresolved {
                    produced,
                    reason: format!("could not instantiate: {reason}"),
                }),
            Selection::Value(_) | Selection::Nothing => Err(Unresolved {
                produced,
                reason: "expected a schema or a field".to_string(),
            }),
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, ResolvedTarget::Schema(_))
    }

    pub fn describe(&self) -> String {
        match self {
            ResolvedTarget::Schema(schema) => format!("schema {}", schema.name()),
            ResolvedTarget::Field(field) => format!("field {field:?}"),
        }
    }
}

/// Per-value schema selection for a polymorphic field.
///
/// The two selectors are required. The modifiers default to the identity and
/// exist to rewrite a value around delegation, e.g. to wrap it into or unwrap
/// it out of a tagged envelope.
pub trait SchemaResolver: Send + Sync {
    /// Pick the target that dumps `value`, an element of `parent`'s attribute.
    fn serialization_schema_selector(&self, value: &Value, parent: &Value)
        -> SelectorResult<Selection>;

    /// Pick the target that loads raw `value`, found inside raw `parent`.
    fn deserialization_schema_selector(
        &self,
        value: &Value,
        parent: Option<&Value>,
    ) -> SelectorResult<Selection>;

    /// Rewrite `value` before it is handed to the serialization target.
    fn serialization_value_modifier<'v>(
        &self,
        value: &'v Value,
        _parent: &Value,
    ) -> SelectorResult<Cow<'v, Value>> {
        Ok(Cow::Borrowed(value))
    }

    /// Rewrite raw `value` before it is handed to the deserialization target.
    fn deserialization_value_modifier<'v>(
        &self,
        value: &'v Value,
        _parent: Option<&Value>,
    ) -> SelectorResult<Cow<'v, Value>> {
        Ok(Cow::Borrowed(value))
    }
}

impl<R: SchemaResolver + ?Sized> SchemaResolver for Arc<R> {
    fn serialization_schema_selector(
        &self,
        value: &Value,
        parent: &Value,
    ) -> SelectorResult<Selection> {
        (**self).serialization_schema_selector(value, parent)
    }

    fn deserialization_schema_selector(
        &self,
        value: &Value,
        parent: Option<&Value>,
    ) -> SelectorResult<Selection> {
        (**self).deserialization_schema_selector(value, parent)
    }

    fn serialization_value_modifier<'v>(
        &self,
        value: &'v Value,
        parent: &Value,
    ) -> SelectorResult<Cow<'v, Value>> {
        (**self).serialization_value_modifier(value, parent)
    }

    fn deserialization_value_modifier<'v>(
        &self,
        value: &'v Value,
        parent: Option<&Value>,
    ) -> SelectorResult<Cow<'v, Value>> {
        (**self).deserialization_value_modifier(value, parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Integer, Str};
    use crate::schema::ObjectSchema;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Point;

    impl Schema for Point {
        fn name(&self) -> &str {
            "Point"
        }

        fn load(
            &self,
            raw: &Value,
            _partial: &crate::partial::Partial,
            _context: &crate::context::Context,
        ) -> crate::error::Result<Value> {
            Ok(raw.clone())
        }

        fn dump(
            &self,
            value: &Value,
            _context: &crate::context::Context,
        ) -> crate::error::Result<Value> {
            Ok(value.clone())
        }
    }

    #[test]
    fn instances_pass_through() {
        let target =
            ResolvedTarget::resolve(Selection::schema(ObjectSchema::new("Shape"))).unwrap();
        assert!(target.is_schema());
        assert_eq!(target.describe(), "schema Shape");

        let target = ResolvedTarget::resolve(Selection::field(Str::new())).unwrap();
        assert!(!target.is_schema());
    }

    #[test]
    fn classes_are_instantiated() {
        let target = ResolvedTarget::resolve(SchemaClass::of::<Point>().into()).unwrap();
        assert_eq!(target.describe(), "schema Point");

        let target = ResolvedTarget::resolve(FieldClass::of::<Integer>().into()).unwrap();
        assert!(matches!(target, ResolvedTarget::Field(_)));
    }

    #[test]
    fn class_names_are_short() {
        assert_eq!(SchemaClass::of::<Point>().name(), "Point");
        assert_eq!(FieldClass::of::<Integer>().name(), "Integer");
    }

    #[test]
    fn failing_constructor_is_unresolved() {
        let class = SchemaClass::new("Broken", || Err("missing settings".to_string()));
        let unresolved = ResolvedTarget::resolve(class.into()).unwrap_err();
        assert_eq!(unresolved.produced, "schema class Broken");
        assert!(unresolved.reason.contains("missing settings"));
    }

    #[test]
    fn plain_values_and_nothing_are_unresolved() {
        let unresolved = ResolvedTarget::resolve(Selection::Value(json!(1))).unwrap_err();
        assert_eq!(unresolved.produced, "int");
        assert!(unresolved.to_string().contains("schema or a field"));

        let unresolved = ResolvedTarget::resolve(Selection::Nothing).unwrap_err();
        assert_eq!(unresolved.produced, "None");
    }

    #[test]
    fn selector_errors_convert() {
        let err: Error = SelectorError::invalid("Base cannot be negative").into();
        assert_eq!(err.to_string(), "Base cannot be negative");

        let err: Error = SelectorError::not_implemented("deserialization_schema_selector").into();
        assert!(matches!(err, Error::NotImplemented { .. }));
    }
}
