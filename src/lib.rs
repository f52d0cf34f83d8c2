//! N-gram language-model scoring for phrase-based decoding.
//!
//! The scoring core lives in `lm-core` and the per-sentence driver in
//! `lm-session`; this crate ties them together behind `LmEngine`, which
//! is built from an engine configuration file.

pub mod api;
mod trace_init;

pub use api::{EngineConfig, EngineError, LmEngine};
pub use lm_core;
pub use lm_session;
pub use trace_init::init_tracing;
