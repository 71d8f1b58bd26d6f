//! The delegation engine behind every polymorphic field.
//!
//! [`PolyField`] owns a [`SchemaResolver`] and implements [`Field`] by asking
//! the resolver, per element, which target handles the value and then handing
//! the (possibly rewritten) value to that target.
//!
//! Loading keeps two failure kinds apart. A selector that cannot produce a
//! usable target yields [`Error::Resolution`] with diagnostics about what it
//! produced; a target that rejects the data yields its own
//! [`Error::Validation`], passed through untouched so nested field paths
//! survive. Dumping collapses every failure into [`Error::Serialization`].
//! [`Error::NotImplemented`] always propagates as is.

use std::fmt;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::PolyFieldConfig;
use crate::context::Context;
use crate::error::{Error, ErrorChainExt, Result, ValidationError, NOT_A_LIST};
use crate::field::{Field, FieldOptions};
use crate::logging::Pretty;
use crate::partial::Partial;
use crate::resolver::{ResolvedTarget, SchemaResolver, SelectorError};

/// A field whose schema is chosen per value by a [`SchemaResolver`].
pub struct PolyField<R> {
    resolver: R,
    many: bool,
    options: FieldOptions,
    context: Context,
}

impl<R: SchemaResolver> PolyField<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            many: false,
            options: FieldOptions::default(),
            context: Context::new(),
        }
    }

    /// Treat the attribute as an ordered list of independently resolved items.
    pub fn many(mut self, many: bool) -> Self {
        self.many = many;
        self
    }

    pub fn required(mut self) -> Self {
        self.options.required = true;
        self
    }

    pub fn allow_none(mut self) -> Self {
        self.options.allow_none = true;
        self
    }

    pub fn with_options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }

    /// Bind the context handed to every resolved schema.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_config(self, config: &PolyFieldConfig) -> Self {
        self.many(config.many).with_options(config.field_options())
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    fn resolve_for_load(&self, value: &Value, parent: Option<&Value>) -> Result<ResolvedTarget> {
        let selection = match self.resolver.deserialization_schema_selector(value, parent) {
            Ok(selection) => selection,
            Err(SelectorError::Invalid(err)) => return Err(Error::Validation(err)),
            Err(SelectorError::NotImplemented { operation }) => {
                return Err(Error::NotImplemented { operation })
            }
            Err(SelectorError::Failed(reason)) => {
                debug!(%reason, "deserialization selector failed for {}", Pretty(value));
                return Err(Error::Resolution {
                    value: value.clone(),
                    produced: "None".to_string(),
                    reason,
                });
            }
        };

        ResolvedTarget::resolve(selection).map_err(|unresolved| {
            debug!(
                produced = %unresolved.produced,
                reason = %unresolved.reason,
                "deserialization selector produced no usable target for {}",
                Pretty(value)
            );
            Error::Resolution {
                value: value.clone(),
                produced: unresolved.produced,
                reason: unresolved.reason,
            }
        })
    }

    fn load_one(
        &self,
        value: &Value,
        attr: Option<&str>,
        parent: Option<&Value>,
        partial: &Partial,
    ) -> Result<Value> {
        let target = self.resolve_for_load(value, parent)?;
        let value = self.resolver.deserialization_value_modifier(value, parent)?;
        trace!(target = %target.describe(), "delegating load");

        match target {
            ResolvedTarget::Field(field) => field.deserialize(&value, attr, parent, partial),
            ResolvedTarget::Schema(schema) => schema.load(&value, partial, &self.context),
        }
    }

    fn try_dump(&self, value: &Value, attr: &str, container: &Value) -> Result<Value> {
        let selection = self.resolver.serialization_schema_selector(value, container)?;
        let target = ResolvedTarget::resolve(selection)
            .map_err(|unresolved| ValidationError::new(unresolved.to_string()))?;
        let value = self.resolver.serialization_value_modifier(value, container)?;
        trace!(target = %target.describe(), "delegating dump");

        match target {
            ResolvedTarget::Field(_) if value.is_null() => Ok(Value::Null),
            ResolvedTarget::Field(field) => field.serialize_value(&value, attr, container),
            ResolvedTarget::Schema(schema) => schema.dump(&value, &self.context),
        }
    }

    fn dump_one(&self, value: &Value, attr: &str, container: &Value) -> Result<Value> {
        self.try_dump(value, attr, container).map_err(|err| match err {
            Error::NotImplemented { .. } => err,
            err => {
                warn!(
                    attribute = attr,
                    error = %err.error_chain(),
                    "failed to serialize polymorphic value"
                );
                Error::Serialization {
                    value: value.clone(),
                    message: err.to_string(),
                }
            }
        })
    }
}

impl<R> fmt::Debug for PolyField<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolyField")
            .field("resolver", &std::any::type_name::<R>())
            .field("many", &self.many)
            .field("options", &self.options)
            .field("context", &self.context)
            .finish()
    }
}

impl<R: SchemaResolver> Field for PolyField<R> {
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
        trace!(attribute = attr.unwrap_or_default(), many = self.many, "loading polymorphic field");
        if !self.many {
            return self.load_one(value, attr, parent, partial);
        }

        let Value::Array(items) = value else {
            return Err(ValidationError::new(NOT_A_LIST).into());
        };
        items
            .iter()
            .map(|item| self.load_one(item, attr, parent, partial))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn serialize_value(&self, value: &Value, attr: &str, container: &Value) -> Result<Value> {
        trace!(attribute = attr, many = self.many, "dumping polymorphic field");
        if !self.many {
            return self.dump_one(value, attr, container);
        }

        let Value::Array(items) = value else {
            return Err(Error::Serialization {
                value: value.clone(),
                message: NOT_A_LIST.to_string(),
            });
        };
        items
            .iter()
            .map(|item| self.dump_one(item, attr, container))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Integer, Str};
    use crate::resolver::{Selection, SelectorResult};
    use crate::schema::{ObjectSchema, Schema};
    use serde_json::json;
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Strings go to `Str`, everything else to `Integer`.
    #[derive(Default)]
    struct ByKind {
        calls: AtomicUsize,
    }

    impl SchemaResolver for ByKind {
        fn serialization_schema_selector(
            &self,
            value: &Value,
            _parent: &Value,
        ) -> SelectorResult<Selection> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(if value.is_string() {
                Selection::field(Str::new())
            } else {
                Selection::field(Integer::new())
            })
        }

        fn deserialization_schema_selector(
            &self,
            value: &Value,
            _parent: Option<&Value>,
        ) -> SelectorResult<Selection> {
            self.serialization_schema_selector(value, &Value::Null)
        }
    }

    struct Unfinished;

    impl SchemaResolver for Unfinished {
        fn serialization_schema_selector(
            &self,
            _value: &Value,
            _parent: &Value,
        ) -> SelectorResult<Selection> {
            Err(SelectorError::not_implemented("serialization_schema_selector"))
        }

        fn deserialization_schema_selector(
            &self,
            _value: &Value,
            _parent: Option<&Value>,
        ) -> SelectorResult<Selection> {
            Err(SelectorError::not_implemented("deserialization_schema_selector"))
        }
    }

    /// Loads every value with a schema whose validator reads the context.
    struct Scoped;

    impl SchemaResolver for Scoped {
        fn serialization_schema_selector(
            &self,
            _value: &Value,
            _parent: &Value,
        ) -> SelectorResult<Selection> {
            Ok(Selection::Schema(scoped_schema()))
        }

        fn deserialization_schema_selector(
            &self,
            _value: &Value,
            _parent: Option<&Value>,
        ) -> SelectorResult<Selection> {
            Ok(Selection::Schema(scoped_schema()))
        }

        fn deserialization_value_modifier<'v>(
            &self,
            value: &'v Value,
            _parent: Option<&Value>,
        ) -> SelectorResult<Cow<'v, Value>> {
            Ok(Cow::Owned(json!({ "n": value })))
        }
    }

    fn scoped_schema() -> Arc<dyn Schema> {
        Arc::new(
            ObjectSchema::new("Scoped")
                .field("n", Integer::new())
                .validator(|_, context| match context.get("tenant") {
                    Some(_) => Ok(()),
                    None => Err(ValidationError::new("no tenant")),
                }),
        )
    }

    #[test]
    fn loads_single_values() {
        let field = PolyField::new(ByKind::default());
        assert_eq!(
            field.deserialize(&json!("red"), Some("x"), None, &Partial::None).unwrap(),
            json!("red")
        );
        assert_eq!(
            field.deserialize(&json!(42), Some("x"), None, &Partial::None).unwrap(),
            json!(42)
        );
    }

    #[test]
    fn many_requires_a_list() {
        let field = PolyField::new(ByKind::default()).many(true);
        let err = field
            .deserialize(&json!("red"), Some("x"), None, &Partial::None)
            .unwrap_err();
        assert_eq!(err.to_string(), NOT_A_LIST);

        let loaded = field
            .deserialize(&json!(["red", 1, "blue"]), Some("x"), None, &Partial::None)
            .unwrap();
        assert_eq!(loaded, json!(["red", 1, "blue"]));
    }

    #[test]
    fn null_dump_skips_the_selector() {
        let field = PolyField::new(ByKind::default());
        assert_eq!(field.serialize("x", &json!({"x": null})).unwrap(), Value::Null);
        assert_eq!(field.serialize("x", &json!({})).unwrap(), Value::Null);
        assert_eq!(field.resolver().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn not_implemented_is_never_wrapped() {
        let field = PolyField::new(Unfinished);
        let err = field
            .deserialize(&json!(1), Some("x"), None, &Partial::None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotImplemented { operation } if operation == "deserialization_schema_selector"
        ));

        let err = field.serialize("x", &json!({"x": 1})).unwrap_err();
        assert!(matches!(err, Error::NotImplemented { .. }));
    }

    #[test]
    fn delegate_failures_on_dump_become_serialization_errors() {
        let field = PolyField::new(ByKind::default());
        let err = field.serialize("x", &json!({"x": [1, 2]})).unwrap_err();
        assert!(matches!(err, Error::Serialization { ref value, .. } if value == &json!([1, 2])));
        assert!(err.to_string().contains("Failed to serialize object"));
    }

    #[test]
    fn bound_context_reaches_schema_targets() {
        let bare = PolyField::new(Scoped);
        let err = bare
            .deserialize(&json!(3), Some("x"), None, &Partial::None)
            .unwrap_err();
        assert!(err.to_string().contains("no tenant"));

        let scoped =
            PolyField::new(Scoped).with_context(Context::new().with("tenant", json!("acme")));
        assert_eq!(
            scoped.deserialize(&json!(3), Some("x"), None, &Partial::None).unwrap(),
            json!({"n": 3})
        );
    }

    #[test]
    fn config_sets_many_and_options() {
        let config = PolyFieldConfig {
            many: true,
            allow_none: true,
            ..Default::default()
        };
        let field = PolyField::new(ByKind::default()).with_config(&config);
        assert!(field.is_many());
        assert!(field.options().allow_none);
        assert_eq!(
            field.deserialize(&Value::Null, Some("x"), None, &Partial::None).unwrap(),
            Value::Null
        );
    }
}
