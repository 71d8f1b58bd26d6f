//! Explicit tagged unions.
//!
//! A [`TaggedUnion`] resolves schemas from a static class -> target mapping.
//! Values are dumped inside a `{"type": tag, "value": payload}` envelope and
//! loaded by reading the tag back. Tags default to the class name and may be
//! overridden per class; two classes may never share a tag.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{EnvelopeKeys, PolyFieldConfig};
use crate::context::Context;
use crate::engine::PolyField;
use crate::error::{Error, Messages, Result, TagCollision, ValidationError, MISSING_REQUIRED};
use crate::field::{Field, FieldOptions};
use crate::fields::{Nested, Str};
use crate::resolver::{ResolvedTarget, SchemaResolver, Selection, SelectorError, SelectorResult};
use crate::schema::{ObjectSchema, Schema};
use crate::value::{Classifier, JsonKind};

/// Builds the envelope schema around the target chosen for a value.
pub type EnvelopeFactory =
    Arc<dyn Fn(ResolvedTarget, &EnvelopeKeys) -> Arc<dyn Schema> + Send + Sync>;

/// Two-way class <-> tag mapping.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: IndexMap<String, String>,
    classes: IndexMap<String, String>,
}

impl TagRegistry {
    /// Derive a tag per class and fail if any tag is claimed twice.
    pub fn new<I, S>(classes: I, overrides: &IndexMap<String, String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: IndexMap<String, String> = classes
            .into_iter()
            .map(Into::into)
            .map(|class| {
                let tag = overrides.get(&class).cloned().unwrap_or_else(|| class.clone());
                (class, tag)
            })
            .collect();

        let mut by_tag: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (class, tag) in &tags {
            by_tag.entry(tag.as_str()).or_default().push(class.clone());
        }

        let mut collisions: Vec<TagCollision> = by_tag
            .into_iter()
            .filter(|(_, classes)| classes.len() > 1)
            .map(|(tag, mut classes)| {
                classes.sort();
                TagCollision {
                    tag: tag.to_string(),
                    classes,
                }
            })
            .collect();
        if !collisions.is_empty() {
            collisions.sort_by(|a, b| a.classes.cmp(&b.classes));
            return Err(Error::DuplicateTags { collisions });
        }

        let classes = tags
            .iter()
            .map(|(class, tag)| (tag.clone(), class.clone()))
            .collect();
        Ok(Self { tags, classes })
    }

    pub fn tag_for(&self, class: &str) -> Option<&str> {
        self.tags.get(class).map(String::as_str)
    }

    pub fn class_for(&self, tag: &str) -> Option<&str> {
        self.classes.get(tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// `(class, tag)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(c, t)| (c.as_str(), t.as_str()))
    }
}

/// The default envelope: a required string tag and the payload handled by
/// the inner target.
pub fn default_envelope(inner: ResolvedTarget, keys: &EnvelopeKeys) -> Arc<dyn Schema> {
    let payload: Arc<dyn Field> = match inner {
        ResolvedTarget::Field(field) => field,
        ResolvedTarget::Schema(schema) => Arc::new(Nested::from_arc(schema)),
    };
    Arc::new(
        ObjectSchema::new("Envelope")
            .field(keys.type_key.clone(), Str::new().required())
            .field_arc(keys.value_key.clone(), payload),
    )
}

/// A [`SchemaResolver`] backed by a fixed class -> target mapping.
pub struct TaggedUnion {
    classifier: Arc<dyn Classifier>,
    targets: IndexMap<String, Selection>,
    registry: TagRegistry,
    envelope: EnvelopeFactory,
    keys: EnvelopeKeys,
}

impl TaggedUnion {
    pub fn builder() -> TaggedUnionBuilder {
        TaggedUnionBuilder::default()
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    pub fn tag_for(&self, class: &str) -> Option<&str> {
        self.registry.tag_for(class)
    }

    pub fn class_for(&self, tag: &str) -> Option<&str> {
        self.registry.class_for(tag)
    }

    pub fn keys(&self) -> &EnvelopeKeys {
        &self.keys
    }

    fn class_of(&self, value: &Value) -> SelectorResult<String> {
        self.classifier
            .classify(value)
            .ok_or_else(|| SelectorError::failed(format!("could not classify {value}")))
    }

    fn tag_of(&self, value: &Value) -> SelectorResult<&str> {
        let class = self.class_of(value)?;
        self.registry
            .tag_for(&class)
            .ok_or_else(|| unregistered(&class))
    }
}

fn unregistered(class: &str) -> SelectorError {
    SelectorError::failed(format!("no schema registered for class '{class}'"))
}

impl fmt::Debug for TaggedUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedUnion")
            .field("registry", &self.registry)
            .field("keys", &self.keys)
            .finish()
    }
}

impl SchemaResolver for TaggedUnion {
    fn serialization_schema_selector(
        &self,
        value: &Value,
        _parent: &Value,
    ) -> SelectorResult<Selection> {
        let class = self.class_of(value)?;
        let selection = self
            .targets
            .get(&class)
            .cloned()
            .ok_or_else(|| unregistered(&class))?;
        let inner = ResolvedTarget::resolve(selection)
            .map_err(|unresolved| SelectorError::failed(unresolved.to_string()))?;
        Ok(Selection::Schema((self.envelope)(inner, &self.keys)))
    }

    fn serialization_value_modifier<'v>(
        &self,
        value: &'v Value,
        _parent: &Value,
    ) -> SelectorResult<Cow<'v, Value>> {
        let tag = self.tag_of(value)?;
        let mut envelope = Map::new();
        envelope.insert(self.keys.type_key.clone(), Value::String(tag.to_string()));
        envelope.insert(self.keys.value_key.clone(), value.clone());
        Ok(Cow::Owned(Value::Object(envelope)))
    }

    fn deserialization_schema_selector(
        &self,
        value: &Value,
        _parent: Option<&Value>,
    ) -> SelectorResult<Selection> {
        let tag = value
            .get(&self.keys.type_key)
            .and_then(Value::as_str)
            .ok_or_else(|| SelectorError::failed(format!("missing '{}' tag", self.keys.type_key)))?;
        let class = self
            .registry
            .class_for(tag)
            .ok_or_else(|| SelectorError::failed(format!("unknown tag '{tag}'")))?;
        self.targets
            .get(class)
            .cloned()
            .ok_or_else(|| unregistered(&class))
    }

    fn deserialization_value_modifier<'v>(
        &self,
        value: &'v Value,
        _parent: Option<&Value>,
    ) -> SelectorResult<Cow<'v, Value>> {
        match value.get(&self.keys.value_key) {
            Some(payload) => Ok(Cow::Borrowed(payload)),
            None => {
                let mut messages = BTreeMap::new();
                messages.insert(self.keys.value_key.clone(), Messages::single(MISSING_REQUIRED));
                Err(ValidationError::keyed(messages).into())
            }
        }
    }
}

/// A polymorphic field that encodes values as explicit tagged unions.
pub type ExplicitPolyField = PolyField<TaggedUnion>;

impl PolyField<TaggedUnion> {
    pub fn builder() -> TaggedUnionBuilder {
        TaggedUnionBuilder::default()
    }
}

/// Builder for [`TaggedUnion`] and [`ExplicitPolyField`].
pub struct TaggedUnionBuilder {
    targets: IndexMap<String, Selection>,
    overrides: IndexMap<String, String>,
    classifier: Arc<dyn Classifier>,
    envelope: EnvelopeFactory,
    keys: EnvelopeKeys,
    many: bool,
    options: FieldOptions,
    context: Context,
}

impl Default for TaggedUnionBuilder {
    fn default() -> Self {
        Self {
            targets: IndexMap::new(),
            overrides: IndexMap::new(),
            classifier: Arc::new(JsonKind),
            envelope: Arc::new(default_envelope),
            keys: EnvelopeKeys::default(),
            many: false,
            options: FieldOptions::default(),
            context: Context::new(),
        }
    }
}

impl TaggedUnionBuilder {
    /// Register the target used for values of `class`.
    pub fn class(mut self, class: impl Into<String>, target: impl Into<Selection>) -> Self {
        self.targets.insert(class.into(), target.into());
        self
    }

    /// Encode `class` under `tag` instead of its own name.
    pub fn rename(mut self, class: impl Into<String>, tag: impl Into<String>) -> Self {
        self.overrides.insert(class.into(), tag.into());
        self
    }

    pub fn classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn envelope<F>(mut self, factory: F) -> Self
    where
        F: Fn(ResolvedTarget, &EnvelopeKeys) -> Arc<dyn Schema> + Send + Sync + 'static,
    {
        self.envelope = Arc::new(factory);
        self
    }

    pub fn keys(mut self, keys: EnvelopeKeys) -> Self {
        self.keys = keys;
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

    /// Take the envelope keys and field options from a loaded configuration.
    pub fn config(mut self, config: &PolyFieldConfig) -> Self {
        self.keys = config.envelope.clone();
        self.many = config.many;
        self.options = config.field_options();
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Build only the resolver.
    pub fn build_resolver(self) -> Result<TaggedUnion> {
        self.keys.validate()?;
        let registry = TagRegistry::new(self.targets.keys().cloned(), &self.overrides)?;
        debug!(
            classes = registry.len(),
            type_key = %self.keys.type_key,
            value_key = %self.keys.value_key,
            "built tag registry"
        );
        Ok(TaggedUnion {
            classifier: self.classifier,
            targets: self.targets,
            registry,
            envelope: self.envelope,
            keys: self.keys,
        })
    }

    pub fn build(self) -> Result<ExplicitPolyField> {
        let many = self.many;
        let options = self.options;
        let context = self.context.clone();
        Ok(PolyField::new(self.build_resolver()?)
            .many(many)
            .with_options(options)
            .with_context(context))
    }
}
