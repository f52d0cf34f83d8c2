//! Language-model oracle contract and the ARPA back-off implementation.
//!
//! The featurizer only sees `dyn LanguageModel`: a deterministic scorer
//! that extends an opaque `LmState` with new tokens and reports the
//! incremental log10 probability of those tokens.

mod arpa;
mod arpa_io;

pub use arpa::BackoffModel;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use crate::token::Token;

/// Unified error type for language-model loading and saving.
#[derive(Debug, thiserror::Error)]
pub enum LmError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected LMBX)")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("checksum mismatch (expected {expected:08x}, got {actual:08x})")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("serialization error: {0}")]
    Serialize(bincode::Error),

    #[error("deserialization error: {0}")]
    Deserialize(bincode::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("invalid model: {0}")]
    InvalidModel(String),
}

/// Continuation state produced by one scoring call.
///
/// `score` is the incremental contribution of that call only. `context`
/// is whatever trailing history the producing model needs to continue;
/// other components must treat it as opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct LmState {
    score: f64,
    context: Arc<[Token]>,
}

impl LmState {
    pub fn new(score: f64, context: impl Into<Arc<[Token]>>) -> Self {
        Self {
            score,
            context: context.into(),
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn context(&self) -> &[Token] {
        &self.context
    }
}

/// The scoring oracle consumed by the featurizer.
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Longest n-gram the model scores.
    fn order(&self) -> usize;

    fn start_token(&self) -> Token;

    fn end_token(&self) -> Token;

    /// Score `sequence[start_index..]` after the trailing context held in
    /// `prior` (no context when `None`). Tokens before `start_index` only
    /// provide history.
    fn score(&self, sequence: &[Token], start_index: usize, prior: Option<&LmState>) -> LmState;
}

/// Load a model file as a trait object. See [`BackoffModel::load`].
pub fn load(path: &Path) -> Result<Arc<dyn LanguageModel>, LmError> {
    Ok(Arc::new(BackoffModel::load(path)?))
}

impl BackoffModel {
    /// Load a model file, detecting the compiled binary image by its magic
    /// bytes and falling back to ARPA text otherwise.
    pub fn load(path: &Path) -> Result<Self, LmError> {
        let mut magic = [0u8; 4];
        let is_binary = {
            let mut file = File::open(path)?;
            match file.read_exact(&mut magic) {
                Ok(()) => &magic == arpa_io::MAGIC,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
                Err(e) => return Err(e.into()),
            }
        };
        if is_binary {
            Self::open(path)
        } else {
            Self::load_arpa(path)
        }
    }
}
