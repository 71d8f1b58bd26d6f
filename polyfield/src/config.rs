//! Field configuration loaded with Figment.
//!
//! Precedence, lowest to highest: built-in defaults, an optional TOML/YAML/JSON
//! file, then `POLYFIELD_` environment variables. Nested keys use a double
//! underscore, e.g. `POLYFIELD_ENVELOPE__TYPE_KEY=kind`.

use std::path::Path;

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::field::FieldOptions;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "POLYFIELD_";

/// Keys of the `{type, value}` envelope used by tagged unions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeKeys {
    pub type_key: String,
    pub value_key: String,
}

impl EnvelopeKeys {
    /// Both keys must be non-empty and distinct.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.type_key.is_empty() || self.value_key.is_empty() {
            "keys must not be empty"
        } else if self.type_key == self.value_key {
            "type and value keys must differ"
        } else {
            return Ok(());
        };
        Err(Error::InvalidEnvelopeKeys {
            type_key: self.type_key.clone(),
            value_key: self.value_key.clone(),
            reason,
        })
    }
}

impl Default for EnvelopeKeys {
    fn default() -> Self {
        Self {
            type_key: "type".to_string(),
            value_key: "value".to_string(),
        }
    }
}

/// Options for a polymorphic field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolyFieldConfig {
    /// The attribute holds an ordered list of independently resolved items.
    pub many: bool,
    pub required: bool,
    pub allow_none: bool,
    pub envelope: EnvelopeKeys,
}

impl PolyFieldConfig {
    /// Defaults only.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(PolyFieldConfig::default()))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.envelope.validate()?;
        Ok(config)
    }

    /// Load defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Self::figment();

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::ConfigFileNotFound {
                    path: path.to_path_buf(),
                });
            }
            let format = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_ascii_lowercase();
            figment = match format.as_str() {
                "toml" => figment.merge(Toml::file(path)),
                "yaml" | "yml" => figment.merge(Yaml::file(path)),
                "json" => figment.merge(Json::file(path)),
                _ => return Err(Error::UnsupportedFormat { format }),
            };
            debug!(path = %path.display(), "merged polyfield configuration file");
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    pub fn field_options(&self) -> FieldOptions {
        FieldOptions {
            required: self.required,
            allow_none: self.allow_none,
        }
    }
}
