//! Error types for polymorphic fields
//!
//! Failures are split by origin so callers can pattern-match on them:
//!
//! - [`Error::Validation`]: bad input rejected by a delegate or by a selector.
//!   Passed through verbatim so nested field paths survive.
//! - [`Error::Resolution`]: a deserialization selector could not produce a
//!   usable schema or field. Reported as a validation failure with diagnostics.
//! - [`Error::Serialization`]: anything that went wrong while dumping.
//! - [`Error::NotImplemented`]: a resolver left a contract method unimplemented.
//!   Never folded into validation output.
//! - Construction failures ([`Error::DuplicateTags`], [`Error::MissingSelector`],
//!   [`Error::Config`]) surface before a field is ever used.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Result type for polymorphic field operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message emitted when a required field is absent from the input.
pub const MISSING_REQUIRED: &str = "Missing data for required field.";

/// Message emitted when a null value reaches a field that does not allow it.
pub const NULL_NOT_ALLOWED: &str = "Field may not be null.";

/// Message emitted when a schema receives something other than a mapping.
pub const INVALID_INPUT: &str = "Invalid input type.";

/// Message emitted when a "many" field receives something other than a list.
pub const NOT_A_LIST: &str = "Not a valid list.";

/// Message emitted for input keys a schema does not declare.
pub const UNKNOWN_FIELD: &str = "Unknown field.";

/// Key under which schema-level validator messages are collected.
pub const SCHEMA_KEY: &str = "_schema";

/// Severity levels for error classification
///
/// - **Warning**: the input was rejected; the caller should report it back.
/// - **Error**: the operation failed but the field remains usable.
/// - **Critical**: the field is misconfigured and cannot be used as built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Warning,
    Error,
    Critical,
}

/// Trait for error types that carry a severity level
pub trait Severity {
    fn severity(&self) -> ErrorSeverity;
}

/// Validation messages, either a flat list or nested by field name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Messages {
    List(Vec<String>),
    Nested(BTreeMap<String, Messages>),
}

impl Messages {
    /// A list holding a single message.
    pub fn single(message: impl Into<String>) -> Self {
        Messages::List(vec![message.into()])
    }

    /// Every message with its dotted field path (empty for top-level messages).
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        match self {
            Messages::List(items) => {
                out.extend(items.iter().map(|m| (prefix.to_string(), m.clone())));
            }
            Messages::Nested(map) => {
                for (key, nested) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    nested.flatten_into(&path, out);
                }
            }
        }
    }

    /// Look up the messages recorded for a field name.
    pub fn get(&self, key: &str) -> Option<&Messages> {
        match self {
            Messages::Nested(map) => map.get(key),
            Messages::List(_) => None,
        }
    }
}

impl fmt::Display for Messages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .flatten()
            .into_iter()
            .map(|(path, message)| {
                if path.is_empty() {
                    message
                } else {
                    format!("{path}: {message}")
                }
            })
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

/// A validation failure raised by a field, a schema or a selector.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{messages}")]
pub struct ValidationError {
    messages: Messages,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            messages: Messages::single(message),
        }
    }

    /// Messages keyed by field name.
    pub fn keyed(messages: BTreeMap<String, Messages>) -> Self {
        Self {
            messages: Messages::Nested(messages),
        }
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn into_messages(self) -> Messages {
        self.messages
    }

    /// True if any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages
            .flatten()
            .iter()
            .any(|(_, message)| message.contains(needle))
    }
}

/// Which way a value travels through a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Serialization,
    Deserialization,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Serialization => write!(f, "serialization"),
            Direction::Deserialization => write!(f, "deserialization"),
        }
    }
}

/// One tag claimed by more than one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCollision {
    pub tag: String,
    /// Colliding class names, sorted.
    pub classes: Vec<String>,
}

impl fmt::Display for TagCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' claimed by [{}]", self.tag, self.classes.join(", "))
    }
}

fn format_collisions(collisions: &[TagCollision]) -> String {
    collisions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur in polymorphic field operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A resolver did not implement a contract method
    #[error("{operation} is not implemented")]
    NotImplemented { operation: &'static str },

    /// The deserialization selector did not produce a schema or field
    #[error(
        "Unable to use schema. Error: {reason}. Ensure the deserialization selector returns \
         a field or a schema when passed {value}. Got {produced}; make sure it is a field or \
         a schema."
    )]
    Resolution {
        value: Value,
        produced: String,
        reason: String,
    },

    /// Input rejected by a delegate or by a selector
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Anything that failed while serializing a value
    #[error(
        "Failed to serialize object. Error: {message}. Ensure the serialization selector returns \
         a schema or field that can serialize this value: {value}"
    )]
    Serialization { value: Value, message: String },

    /// Two or more classes map to the same tag
    #[error("duplicate tag names: {}", format_collisions(.collisions))]
    DuplicateTags { collisions: Vec<TagCollision> },

    /// A resolving field was built without one of its selectors
    #[error("polymorphic field requires a {direction} schema selector")]
    MissingSelector { direction: Direction },

    /// The tagged-union envelope keys cannot tell tag and payload apart
    #[error("invalid envelope keys (type: '{type_key}', value: '{value_key}'): {reason}")]
    InvalidEnvelopeKeys {
        type_key: String,
        value_key: String,
        reason: &'static str,
    },

    /// Configuration file not found
    #[error("configuration file not found: {path}")]
    ConfigFileNotFound { path: PathBuf },

    /// Configuration file format not supported
    #[error("unsupported configuration file format: {format}")]
    UnsupportedFormat { format: String },

    /// Configuration could not be extracted
    #[error("failed to load configuration: {source}")]
    Config { source: Box<figment::Error> },
}

impl From<figment::Error> for Error {
    fn from(error: figment::Error) -> Self {
        Error::Config {
            source: Box::new(error),
        }
    }
}

impl Error {
    pub fn not_implemented(operation: &'static str) -> Self {
        Error::NotImplemented { operation }
    }

    /// True for failures that belong in a validation report.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Resolution { .. })
    }

    /// Convert into a [`ValidationError`], or hand the error back if it is not
    /// a validation failure.
    pub fn into_validation(self) -> std::result::Result<ValidationError, Error> {
        match self {
            Error::Validation(err) => Ok(err),
            err @ Error::Resolution { .. } => Ok(ValidationError::new(err.to_string())),
            other => Err(other),
        }
    }
}

impl Severity for Error {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Error::Validation(_) => ErrorSeverity::Warning,
            Error::Resolution { .. } => ErrorSeverity::Warning,

            Error::Serialization { .. } => ErrorSeverity::Error,

            Error::NotImplemented { .. } => ErrorSeverity::Critical,
            Error::DuplicateTags { .. } => ErrorSeverity::Critical,
            Error::MissingSelector { .. } => ErrorSeverity::Critical,
            Error::InvalidEnvelopeKeys { .. } => ErrorSeverity::Critical,
            Error::ConfigFileNotFound { .. } => ErrorSeverity::Critical,
            Error::UnsupportedFormat { .. } => ErrorSeverity::Critical,
            Error::Config { .. } => ErrorSeverity::Critical,
        }
    }
}

/// Error chain formatter for log output
pub struct ErrorChain<'a>(&'a dyn std::error::Error);

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;

        let mut current = self.0.source();
        while let Some(err) = current {
            write!(f, ": caused by: {}", err)?;
            current = err.source();
        }

        Ok(())
    }
}

/// Extension trait for formatting the full error chain
pub trait ErrorChainExt {
    fn error_chain(&self) -> ErrorChain<'_>;
}

impl<E: std::error::Error> ErrorChainExt for E {
    fn error_chain(&self) -> ErrorChain<'_> {
        ErrorChain(self)
    }
}
