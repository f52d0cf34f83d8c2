//! Word-to-class projection for class-based language models.
//!
//! A `WordClassMap` is built once (from a text file or in memory) and is
//! read-only afterwards, so one instance can serve every decoding thread.
//! A process-wide default map can be installed for featurizers that are
//! class-based but do not name their own map.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::{debug_span, info};

use crate::token::Token;

#[derive(Debug, thiserror::Error)]
pub enum ClassMapError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("word '{word}' mapped to both '{first}' and '{second}'")]
    Conflict {
        word: String,
        first: String,
        second: String,
    },

    #[error("token '{0}' has no class in the class map")]
    UnmappedToken(String),

    #[error("default class map already installed")]
    AlreadyInitialized,
}

/// Immutable surjective mapping from surface tokens to class tokens.
#[derive(Debug, Clone, Default)]
pub struct WordClassMap {
    classes: HashMap<Token, Token>,
}

impl WordClassMap {
    /// Build from `(word, class)` pairs. Conflicting duplicates are rejected.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ClassMapError>
    where
        I: IntoIterator<Item = (Token, Token)>,
    {
        let mut classes = HashMap::new();
        for (word, class) in pairs {
            insert(&mut classes, word, class)?;
        }
        Ok(Self { classes })
    }

    /// Parse the `word<whitespace>class` text format.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_text(text: &str) -> Result<Self, ClassMapError> {
        let mut classes = HashMap::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 2 {
                return Err(ClassMapError::Parse {
                    line: i + 1,
                    reason: format!("expected 2 fields, got {}", fields.len()),
                });
            }
            insert(
                &mut classes,
                Token::intern(fields[0]),
                Token::intern(fields[1]),
            )?;
        }
        Ok(Self { classes })
    }

    pub fn load(path: &Path) -> Result<Self, ClassMapError> {
        let _span = debug_span!("class_map_load", path = %path.display()).entered();
        let text = fs::read_to_string(path)?;
        let map = Self::from_text(&text)?;
        info!(
            words = map.len(),
            classes = map.num_classes(),
            "loaded class map"
        );
        Ok(map)
    }

    pub fn get(&self, word: Token) -> Option<Token> {
        self.classes.get(&word).copied()
    }

    /// Replace every token by its class.
    ///
    /// Tokens listed in `preserved` are copied through unchanged; any other
    /// token without a class is an error.
    pub fn project(&self, seq: &[Token], preserved: &[Token]) -> Result<Vec<Token>, ClassMapError> {
        seq.iter()
            .map(|&t| {
                if preserved.contains(&t) {
                    return Ok(t);
                }
                self.get(t)
                    .ok_or_else(|| ClassMapError::UnmappedToken(t.as_str().to_string()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Number of distinct class tokens.
    pub fn num_classes(&self) -> usize {
        let mut seen: Vec<Token> = self.classes.values().copied().collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

fn insert(
    classes: &mut HashMap<Token, Token>,
    word: Token,
    class: Token,
) -> Result<(), ClassMapError> {
    match classes.insert(word, class) {
        Some(prev) if prev != class => Err(ClassMapError::Conflict {
            word: word.to_string(),
            first: prev.to_string(),
            second: class.to_string(),
        }),
        _ => Ok(()),
    }
}

static DEFAULT_MAP: OnceLock<Arc<WordClassMap>> = OnceLock::new();

/// Install the process-wide default class map. Can only be done once.
pub fn install_default_class_map(map: Arc<WordClassMap>) -> Result<(), ClassMapError> {
    DEFAULT_MAP
        .set(map)
        .map_err(|_| ClassMapError::AlreadyInitialized)
}

/// The process-wide default class map, if one has been installed.
pub fn default_class_map() -> Option<Arc<WordClassMap>> {
    DEFAULT_MAP.get().map(Arc::clone)
}
