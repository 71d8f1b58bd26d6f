//! Polymorphic schema fields
//!
//! `polyfield` provides fields whose schema is chosen per value. A field holds a
//! [`SchemaResolver`] that inspects each value (and its parent record) and names
//! the schema or field that should load or dump it.
//!
//! # Architecture
//!
//! - **Host model**: [`Field`], [`Schema`], [`ObjectSchema`] and the concrete
//!   fields in [`fields`] form a small validation library over `serde_json::Value`
//! - **Resolution contract**: [`SchemaResolver`] with two required selectors and
//!   two identity-by-default value modifiers
//! - **Engine**: [`PolyField`] drives any resolver, element by element when `many`
//! - **Adapters**: [`ResolvingField`] takes selector closures, [`ExplicitPolyField`]
//!   encodes values as `{"type": tag, "value": payload}` from a static registry
//!
//! ```ignore
//! use polyfield::{ExplicitPolyField, FieldClass, fields::{Integer, Str}};
//!
//! let field = ExplicitPolyField::builder()
//!     .class("str", FieldClass::of::<Str>())
//!     .class("int", FieldClass::of::<Integer>())
//!     .build()?;
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod field;
pub mod fields;
pub mod logging;
pub mod partial;
pub mod resolver;
pub mod resolving;
pub mod schema;
pub mod tagged;
pub mod value;

pub use config::{EnvelopeKeys, PolyFieldConfig, ENV_PREFIX};
pub use context::Context;
pub use engine::PolyField;
pub use error::{
    Direction, Error, ErrorChainExt, ErrorSeverity, Messages, Result, Severity, TagCollision,
    ValidationError,
};
pub use field::{Field, FieldOptions};
pub use logging::Pretty;
pub use partial::Partial;
pub use resolver::{
    FieldClass, ResolvedTarget, SchemaClass, SchemaResolver, Selection, SelectorError,
    SelectorResult, Unresolved,
};
pub use resolving::{FnResolver, ResolvingField, ResolvingFieldBuilder};
pub use schema::{ObjectSchema, Schema, SchemaValidator, Unknown};
pub use tagged::{
    default_envelope, EnvelopeFactory, ExplicitPolyField, TagRegistry, TaggedUnion,
    TaggedUnionBuilder,
};
pub use value::{value_class, Classifier, Discriminator, JsonKind};
