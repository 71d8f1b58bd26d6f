//! Shape fixtures shared by the integration tests.
//!
//! Shapes are plain JSON records. A triangle has `base`/`height`, a rectangle
//! has `length`/`width`, and both carry an optional `color`.

#![allow(dead_code)]

use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use polyfield::fields::{Integer, Str};
use polyfield::{
    ObjectSchema, ResolvingField, ResolvingFieldBuilder, Schema, SchemaClass, SchemaResolver,
    Selection, SelectorError, SelectorResult,
};
use serde_json::{json, Value};

pub const UNDETECTED_SHAPE: &str =
    "Could not detect type. Did not have a base or a length. Are you sure this is a shape?";

pub fn shape_schema() -> ObjectSchema {
    ObjectSchema::new("Shape").field("color", Str::new().allow_none())
}

pub fn triangle_schema() -> ObjectSchema {
    shape_schema()
        .extend("Triangle")
        .field("base", Integer::new().required())
        .field("height", Integer::new().required())
}

pub fn rectangle_schema() -> ObjectSchema {
    shape_schema()
        .extend("Rectangle")
        .field("length", Integer::new().required())
        .field("width", Integer::new().required())
}

pub fn triangle_class() -> SchemaClass {
    SchemaClass::new("TriangleSchema", || {
        Ok(Arc::new(triangle_schema()) as Arc<dyn Schema>)
    })
}

pub fn rectangle_class() -> SchemaClass {
    SchemaClass::new("RectangleSchema", || {
        Ok(Arc::new(rectangle_schema()) as Arc<dyn Schema>)
    })
}

pub fn rectangle(color: &str, length: i64, width: i64) -> Value {
    json!({"color": color, "length": length, "width": width})
}

pub fn triangle(color: &str, base: i64, height: i64) -> Value {
    json!({"color": color, "base": base, "height": height})
}

/// Class name of an in-memory shape, if it is one.
pub fn shape_class(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    if object.contains_key("base") {
        Some("Triangle".to_string())
    } else if object.contains_key("length") {
        Some("Rectangle".to_string())
    } else {
        None
    }
}

pub fn shape_serialization_selector(value: &Value, _parent: &Value) -> SelectorResult<Selection> {
    match shape_class(value).as_deref() {
        Some("Triangle") => Ok(Selection::schema(triangle_schema())),
        Some("Rectangle") => Ok(Selection::schema(rectangle_schema())),
        _ => Err(SelectorError::failed(UNDETECTED_SHAPE)),
    }
}

/// Picks a schema class from the raw keys, as a hand-written disambiguator would.
pub fn shape_deserialization_selector(
    value: &Value,
    _parent: Option<&Value>,
) -> SelectorResult<Selection> {
    if value.get("base").is_some() {
        Ok(triangle_class().into())
    } else if value.get("length").is_some() {
        Ok(rectangle_class().into())
    } else {
        Err(SelectorError::failed(UNDETECTED_SHAPE))
    }
}

/// Like [`shape_deserialization_selector`] but rejects negative bases outright.
pub fn strict_shape_deserialization_selector(
    value: &Value,
    parent: Option<&Value>,
) -> SelectorResult<Selection> {
    if value.get("base").and_then(Value::as_i64).is_some_and(|b| b < 0) {
        return Err(SelectorError::invalid("Base cannot be negative"));
    }
    shape_deserialization_selector(value, parent)
}

/// Chooses by the parent record's `type` key.
pub fn parent_type_serialization_selector(
    value: &Value,
    parent: &Value,
) -> SelectorResult<Selection> {
    match parent.get("type").and_then(Value::as_str) {
        Some("rectangle") => Ok(Selection::schema(rectangle_schema())),
        Some("triangle") => Ok(Selection::schema(triangle_schema())),
        _ => shape_serialization_selector(value, parent),
    }
}

pub fn parent_type_deserialization_selector(
    value: &Value,
    parent: Option<&Value>,
) -> SelectorResult<Selection> {
    match parent.and_then(|p| p.get("type")).and_then(Value::as_str) {
        Some("rectangle") => Ok(rectangle_class().into()),
        Some("triangle") => Ok(triangle_class().into()),
        _ => shape_deserialization_selector(value, parent),
    }
}

pub fn shape_field_builder() -> ResolvingFieldBuilder {
    ResolvingField::builder()
        .serialization_selector(shape_serialization_selector)
        .deserialization_selector(shape_deserialization_selector)
}

pub fn shape_field() -> ResolvingField {
    shape_field_builder().build().unwrap()
}

/// The same selection logic as a hand-written resolver type.
#[derive(Debug, Default)]
pub struct ShapeResolver;

impl SchemaResolver for ShapeResolver {
    fn serialization_schema_selector(
        &self,
        value: &Value,
        parent: &Value,
    ) -> SelectorResult<Selection> {
        shape_serialization_selector(value, parent)
    }

    fn deserialization_schema_selector(
        &self,
        value: &Value,
        parent: Option<&Value>,
    ) -> SelectorResult<Selection> {
        shape_deserialization_selector(value, parent)
    }
}

/// `main` is a required shape, `others` an optional list of shapes.
pub fn contrived_schema() -> ObjectSchema {
    ObjectSchema::new("ContrivedShapeClass")
        .field("main", shape_field_builder().required().build().unwrap())
        .field(
            "others",
            shape_field_builder().allow_none().many(true).build().unwrap(),
        )
}

/// A resolver that ignores its input: both modifiers replace the value with
/// `{"a": bad}`.
#[derive(Debug)]
pub struct BadStringValueModifier {
    pub bad: String,
}

impl BadStringValueModifier {
    fn schema() -> Selection {
        Selection::schema(ObjectSchema::new("BadStringValueModifier").field("a", Str::new()))
    }
}

impl SchemaResolver for BadStringValueModifier {
    fn serialization_schema_selector(
        &self,
        _value: &Value,
        _parent: &Value,
    ) -> SelectorResult<Selection> {
        Ok(Self::schema())
    }

    fn deserialization_schema_selector(
        &self,
        _value: &Value,
        _parent: Option<&Value>,
    ) -> SelectorResult<Selection> {
        Ok(Self::schema())
    }

    fn serialization_value_modifier<'v>(
        &self,
        _value: &'v Value,
        _parent: &Value,
    ) -> SelectorResult<Cow<'v, Value>> {
        Ok(Cow::Owned(json!({"a": self.bad})))
    }

    fn deserialization_value_modifier<'v>(
        &self,
        _value: &'v Value,
        _parent: Option<&Value>,
    ) -> SelectorResult<Cow<'v, Value>> {
        Ok(Cow::Owned(json!({"a": self.bad})))
    }
}

/// Wraps a resolver and counts selector calls.
#[derive(Debug, Default)]
pub struct Counting<R> {
    pub inner: R,
    pub calls: AtomicUsize,
}

impl<R> Counting<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<R: SchemaResolver> SchemaResolver for Counting<R> {
    fn serialization_schema_selector(
        &self,
        value: &Value,
        parent: &Value,
    ) -> SelectorResult<Selection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.serialization_schema_selector(value, parent)
    }

    fn deserialization_schema_selector(
        &self,
        value: &Value,
        parent: Option<&Value>,
    ) -> SelectorResult<Selection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.deserialization_schema_selector(value, parent)
    }
}
