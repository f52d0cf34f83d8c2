use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lm_core::class_map::{install_default_class_map, ClassMapError, WordClassMap};
use lm_core::featurizer::{FeatureValue, NGramFeaturizer};
use lm_core::lm::{self, LanguageModel};
use lm_core::settings::{init_custom, parse_settings_toml, settings, SettingsError};
use lm_core::token::Token;
use lm_session::{DecodingSession, SessionError};
use tracing::{debug_span, info, warn};

use super::{EngineConfig, EngineError};

/// Loaded language-model features, shared by every session.
pub struct LmEngine {
    features: Vec<Arc<NGramFeaturizer>>,
}

impl LmEngine {
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let _span = debug_span!("engine_open", path = %path.display()).entered();
        Self::from_config(&EngineConfig::load(path)?)
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        if config.featurizers.is_empty() {
            return Err(EngineError::NoFeaturizers);
        }
        if let Some(path) = &config.settings {
            apply_settings(path)?;
        }
        if let Some(path) = &config.default_class_map {
            install_class_map(path)?;
        }

        // A model shared by several features is loaded once.
        let mut models: HashMap<PathBuf, Arc<dyn LanguageModel>> = HashMap::new();
        let mut names = HashSet::new();
        let mut features = Vec::with_capacity(config.featurizers.len());
        for fc in &config.featurizers {
            if !names.insert(fc.name.as_str()) {
                return Err(EngineError::DuplicateFeature(fc.name.clone()));
            }
            let model = match models.entry(fc.model.clone()) {
                Entry::Occupied(e) => Arc::clone(e.get()),
                Entry::Vacant(e) => {
                    let model = lm::load(&fc.model).map_err(|source| EngineError::Model {
                        path: fc.model.clone(),
                        source,
                    })?;
                    Arc::clone(e.insert(model))
                }
            };
            let f = NGramFeaturizer::from_config_with_model(fc, model).map_err(|source| {
                EngineError::Featurizer {
                    name: fc.name.clone(),
                    source,
                }
            })?;
            features.push(Arc::new(f));
        }

        info!(features = features.len(), models = models.len(), "engine ready");
        Ok(Self { features })
    }

    /// Engine over already built features.
    pub fn from_features(features: Vec<Arc<NGramFeaturizer>>) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[Arc<NGramFeaturizer>] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&Arc<NGramFeaturizer>> {
        self.features.iter().find(|f| f.name() == name)
    }

    pub fn create_session(&self) -> DecodingSession {
        DecodingSession::new(self.features.clone())
    }

    /// Session for decoding constrained to start with `prefix`.
    pub fn create_constrained_session(&self, prefix: &[Token]) -> DecodingSession {
        DecodingSession::with_prefix(self.features.clone(), prefix.to_vec())
    }

    /// Context-free phrase scores, as used for future-cost estimates.
    pub fn option_scores(&self, phrase: &[Token]) -> Result<Vec<FeatureValue>, SessionError> {
        self.create_session().option_scores(phrase)
    }
}

/// Install the settings file. When settings are already in effect the
/// file must agree with them, otherwise features would score under
/// values other than the ones configured.
fn apply_settings(path: &Path) -> Result<(), EngineError> {
    let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let requested = parse_settings_toml(&text)?;
    match init_custom(text) {
        Ok(()) => Ok(()),
        Err(SettingsError::AlreadyInitialized) if requested == *settings() => {
            warn!(path = %path.display(), "settings already initialized with the same values");
            Ok(())
        }
        Err(SettingsError::AlreadyInitialized) => Err(EngineError::SettingsConflict {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

fn install_class_map(path: &Path) -> Result<(), EngineError> {
    let class_map_err = |source| EngineError::ClassMap {
        path: path.to_path_buf(),
        source,
    };
    let map = WordClassMap::load(path).map_err(class_map_err)?;
    match install_default_class_map(Arc::new(map)) {
        Ok(()) => Ok(()),
        Err(ClassMapError::AlreadyInitialized) => {
            warn!(path = %path.display(), "default class map already installed, keeping the first");
            Ok(())
        }
        Err(e) => Err(class_map_err(e)),
    }
}
