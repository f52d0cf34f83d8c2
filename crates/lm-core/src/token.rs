//! Interned vocabulary symbols.
//!
//! Every distinct word is stored once in a process-wide interner and
//! referenced by a 32-bit id, so tokens are `Copy` and compare by integer.
//! Interned strings are never freed.

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};

#[derive(Default)]
struct Interner {
    ids: HashMap<&'static str, u32>,
    words: Vec<&'static str>,
}

fn interner() -> &'static RwLock<Interner> {
    static INSTANCE: OnceLock<RwLock<Interner>> = OnceLock::new();
    INSTANCE.get_or_init(|| RwLock::new(Interner::default()))
}

/// A vocabulary symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u32);

impl Token {
    /// Intern `word`, returning the existing token if it was seen before.
    pub fn intern(word: &str) -> Self {
        {
            let guard = interner().read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&id) = guard.ids.get(word) {
                return Token(id);
            }
        }
        let mut guard = interner().write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have won the race between the two locks.
        if let Some(&id) = guard.ids.get(word) {
            return Token(id);
        }
        let id = guard.words.len() as u32;
        let leaked: &'static str = Box::leak(word.to_owned().into_boxed_str());
        guard.words.push(leaked);
        guard.ids.insert(leaked, id);
        Token(id)
    }

    /// Look up `word` without interning it.
    pub fn lookup(word: &str) -> Option<Self> {
        let guard = interner().read().unwrap_or_else(PoisonError::into_inner);
        guard.ids.get(word).map(|&id| Token(id))
    }

    pub fn as_str(self) -> &'static str {
        let guard = interner().read().unwrap_or_else(PoisonError::into_inner);
        guard.words[self.0 as usize]
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

impl From<&str> for Token {
    fn from(word: &str) -> Self {
        Token::intern(word)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

/// Split on whitespace and intern every word.
pub fn tokenize(text: &str) -> Vec<Token> {
    text.split_whitespace().map(Token::intern).collect()
}

/// Join tokens back into a space-separated string.
pub fn detokenize(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, t) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(t.as_str());
    }
    out
}
