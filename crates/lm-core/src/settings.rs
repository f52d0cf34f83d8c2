//! Global settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();
static INSTANCE: OnceLock<Settings> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
///
/// Fails with `AlreadyInitialized` once a custom TOML was set or the
/// singleton has been read, since the new values could no longer apply.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    if INSTANCE.get().is_some() {
        return Err(SettingsError::AlreadyInitialized);
    }
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub scoring: ScoringSettings,
    pub lm: LmSettings,
    pub metrics: MetricSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringSettings {
    /// Process-wide wrap-boundary mode.
    pub wrap_boundary: bool,
    pub default_feature_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LmSettings {
    pub oov_log_prob: f32,
    pub unknown_word: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricSettings {
    pub bleu_order: usize,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! invalid {
        ($field:literal, $reason:literal) => {
            return Err(SettingsError::InvalidValue {
                field: $field.to_string(),
                reason: $reason.to_string(),
            })
        };
    }

    if s.scoring.default_feature_name.trim().is_empty() {
        invalid!("scoring.default_feature_name", "must not be empty");
    }
    if !s.lm.oov_log_prob.is_finite() || s.lm.oov_log_prob > 0.0 {
        invalid!("lm.oov_log_prob", "must be a finite log10 probability (<= 0)");
    }
    if s.lm.unknown_word.trim().is_empty() {
        invalid!("lm.unknown_word", "must not be empty");
    }
    if !(1..=9).contains(&s.metrics.bleu_order) {
        invalid!("metrics.bleu_order", "must be between 1 and 9");
    }

    Ok(())
}
