use std::fs;
use std::path::{Path, PathBuf};

use lm_core::featurizer::FeaturizerConfig;
use serde::Deserialize;

use super::EngineError;

/// Engine configuration file.
///
/// ```toml
/// settings = "settings.toml"
/// default_class_map = "classes.txt"
///
/// [[featurizer]]
/// model = "lm.arpa"
///
/// [[featurizer]]
/// model = "classes.arpa"
/// name = "ClassLM"
/// classBased = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Global settings TOML, applied before any feature is built.
    #[serde(default)]
    pub settings: Option<PathBuf>,
    /// Class map installed as the process-wide default.
    #[serde(default)]
    pub default_class_map: Option<PathBuf>,
    #[serde(default, rename = "featurizer")]
    pub featurizers: Vec<FeaturizerConfig>,
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read a config file; relative paths inside it are taken relative to
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text).map_err(|source| EngineError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        for p in [&mut self.settings, &mut self.default_class_map]
            .into_iter()
            .flatten()
        {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
        for f in &mut self.featurizers {
            f.resolve_paths(base);
        }
    }
}
