use std::io;
use std::path::PathBuf;

use lm_core::class_map::ClassMapError;
use lm_core::featurizer::ConfigError;
use lm_core::lm::LmError;
use lm_core::settings::SettingsError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("engine config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("settings {} differ from the settings already in effect", path.display())]
    SettingsConflict { path: PathBuf },

    #[error("default class map {}: {source}", path.display())]
    ClassMap {
        path: PathBuf,
        #[source]
        source: ClassMapError,
    },

    #[error("language model {}: {source}", path.display())]
    Model {
        path: PathBuf,
        #[source]
        source: LmError,
    },

    #[error("featurizer '{name}': {source}")]
    Featurizer {
        name: String,
        #[source]
        source: ConfigError,
    },

    #[error("duplicate feature name '{0}'")]
    DuplicateFeature(String),

    #[error("engine config defines no featurizers")]
    NoFeaturizers,
}
