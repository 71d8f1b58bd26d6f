//! Polymorphic fields driven by caller-supplied selector functions.

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::Value;

use crate::config::PolyFieldConfig;
use crate::context::Context;
use crate::engine::PolyField;
use crate::error::{Direction, Error, Result};
use crate::field::FieldOptions;
use crate::resolver::{SchemaResolver, Selection, SelectorResult};

type SerializationSelector = Arc<dyn Fn(&Value, &Value) -> SelectorResult<Selection> + Send + Sync>;
type DeserializationSelector =
    Arc<dyn Fn(&Value, Option<&Value>) -> SelectorResult<Selection> + Send + Sync>;
type SerializationModifier = Arc<dyn Fn(&Value, &Value) -> SelectorResult<Value> + Send + Sync>;
type DeserializationModifier =
    Arc<dyn Fn(&Value, Option<&Value>) -> SelectorResult<Value> + Send + Sync>;

/// A [`SchemaResolver`] assembled from closures.
#[derive(Clone)]
pub struct FnResolver {
    serialization_selector: SerializationSelector,
    deserialization_selector: DeserializationSelector,
    serialization_modifier: Option<SerializationModifier>,
    deserialization_modifier: Option<DeserializationModifier>,
}

impl SchemaResolver for FnResolver {
    fn serialization_schema_selector(
        &self,
        value: &Value,
        parent: &Value,
    ) -> SelectorResult<Selection> {
        (self.serialization_selector)(value, parent)
    }

    fn deserialization_schema_selector(
        &self,
        value: &Value,
        parent: Option<&Value>,
    ) -> SelectorResult<Selection> {
        (self.deserialization_selector)(value, parent)
    }

    fn serialization_value_modifier<'v>(
        &self,
        value: &'v Value,
        parent: &Value,
    ) -> SelectorResult<Cow<'v, Value>> {
        match &self.serialization_modifier {
            Some(modify) => modify(value, parent).map(Cow::Owned),
            None => Ok(Cow::Borrowed(value)),
        }
    }

    fn deserialization_value_modifier<'v>(
        &self,
        value: &'v Value,
        parent: Option<&Value>,
    ) -> SelectorResult<Cow<'v, Value>> {
        match &self.deserialization_modifier {
            Some(modify) => modify(value, parent).map(Cow::Owned),
            None => Ok(Cow::Borrowed(value)),
        }
    }
}

/// A polymorphic field whose selectors and modifiers are plain functions.
pub type ResolvingField = PolyField<FnResolver>;

impl PolyField<FnResolver> {
    pub fn builder() -> ResolvingFieldBuilder {
        ResolvingFieldBuilder::default()
    }
}

/// Builder for [`ResolvingField`]. Both selectors are mandatory.
#[derive(Default)]
pub struct ResolvingFieldBuilder {
    serialization_selector: Option<SerializationSelector>,
    deserialization_selector: Option<DeserializationSelector>,
    serialization_modifier: Option<SerializationModifier>,
    deserialization_modifier: Option<DeserializationModifier>,
    many: bool,
    options: FieldOptions,
    context: Context,
}

impl ResolvingFieldBuilder {
    /// `(value, container) -> selection` for dumping.
    pub fn serialization_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&Value, &Value) -> SelectorResult<Selection> + Send + Sync + 'static,
    {
        self.serialization_selector = Some(Arc::new(selector));
        self
    }

    /// `(raw value, raw parent) -> selection` for loading.
    pub fn deserialization_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> SelectorResult<Selection> + Send + Sync + 'static,
    {
        self.deserialization_selector = Some(Arc::new(selector));
        self
    }

    pub fn serialization_modifier<F>(mut self, modifier: F) -> Self
    where
        F: Fn(&Value, &Value) -> SelectorResult<Value> + Send + Sync + 'static,
    {
        self.serialization_modifier = Some(Arc::new(modifier));
        self
    }

    pub fn deserialization_modifier<F>(mut self, modifier: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> SelectorResult<Value> + Send + Sync + 'static,
    {
        self.deserialization_modifier = Some(Arc::new(modifier));
        self
    }

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

    /// Take `many`, `required` and `allow_none` from a loaded configuration.
    pub fn config(mut self, config: &PolyFieldConfig) -> Self {
        self.many = config.many;
        self.options = config.field_options();
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn build(self) -> Result<ResolvingField> {
        let serialization_selector = self.serialization_selector.ok_or(Error::MissingSelector {
            direction: Direction::Serialization,
        })?;
        let deserialization_selector =
            self.deserialization_selector.ok_or(Error::MissingSelector {
                direction: Direction::Deserialization,
            })?;

        let resolver = FnResolver {
            serialization_selector,
            deserialization_selector,
            serialization_modifier: self.serialization_modifier,
            deserialization_modifier: self.deserialization_modifier,
        };
        Ok(PolyField::new(resolver)
            .many(self.many)
            .with_options(self.options)
            .with_context(self.context))
    }
}
