//! Engine facade: loads an engine configuration, builds the language-model
//! features it names, and hands out decoding sessions.

mod config;
mod engine;
mod types;

pub use config::EngineConfig;
pub use engine::LmEngine;
pub use types::EngineError;
