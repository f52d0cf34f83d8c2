use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::class_map::ClassMapError;
use crate::lm::LmError;
use crate::settings::settings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least two arguments are needed: language model path and feature name")]
    MissingArguments,

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("class-based scoring requested but no class map is available")]
    NoClassMap,

    #[error("language model {}: {source}", path.display())]
    Model {
        path: PathBuf,
        #[source]
        source: LmError,
    },

    #[error("class map {}: {source}", path.display())]
    ClassMap {
        path: PathBuf,
        #[source]
        source: ClassMapError,
    },
}

/// Construction parameters of one language-model feature.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeaturizerConfig {
    /// Model file (ARPA text or compiled image).
    pub model: PathBuf,
    /// Label attached to emitted feature values.
    #[serde(default = "default_feature_name")]
    pub name: String,
    #[serde(default, rename = "classBased", alias = "class_based")]
    pub class_based: bool,
    /// Featurizer-local class map overriding the process-wide default.
    #[serde(default, rename = "classMap", alias = "class_map")]
    pub class_map: Option<PathBuf>,
}

fn default_feature_name() -> String {
    settings().scoring.default_feature_name.clone()
}

impl FeaturizerConfig {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            name: default_feature_name(),
            class_based: false,
            class_map: None,
        }
    }

    /// Parse positional arguments: model path, feature name, then
    /// `key=value` pairs (`classBased`, `classMap`).
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, ConfigError> {
        let [model, name, rest @ ..] = args else {
            return Err(ConfigError::MissingArguments);
        };
        let mut config = Self::new(model.as_ref());
        config.name = name.as_ref().to_string();
        if config.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        for arg in rest {
            let arg = arg.as_ref();
            let (key, value) = arg.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                field: arg.to_string(),
                reason: "expected key=value".to_string(),
            })?;
            match key.trim() {
                "classBased" => config.class_based = parse_bool("classBased", value)?,
                "classMap" => config.class_map = Some(PathBuf::from(value.trim())),
                other => return Err(ConfigError::UnknownParameter(other.to_string())),
            }
        }
        Ok(config)
    }

    /// Make relative paths relative to `base` (usually the directory of
    /// the file the config was read from).
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.model.is_relative() {
            self.model = base.join(&self.model);
        }
        if let Some(map) = &mut self.class_map {
            if map.is_relative() {
                *map = base.join(&*map);
            }
        }
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected true or false, got '{other}'"),
        }),
    }
}
