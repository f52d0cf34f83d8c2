//! Sentence-boundary wrapping for token sequences.

use crate::token::Token;

/// Which boundary markers to add around a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    None,
    Start,
    End,
    Both,
}

impl Boundary {
    pub fn from_flags(is_start: bool, is_end: bool) -> Self {
        match (is_start, is_end) {
            (true, true) => Boundary::Both,
            (true, false) => Boundary::Start,
            (false, true) => Boundary::End,
            (false, false) => Boundary::None,
        }
    }

    pub fn has_start(self) -> bool {
        matches!(self, Boundary::Start | Boundary::Both)
    }

    pub fn has_end(self) -> bool {
        matches!(self, Boundary::End | Boundary::Both)
    }
}

pub fn wrap_start(seq: &[Token], start: Token) -> Vec<Token> {
    let mut out = Vec::with_capacity(seq.len() + 1);
    out.push(start);
    out.extend_from_slice(seq);
    out
}

pub fn wrap_end(seq: &[Token], end: Token) -> Vec<Token> {
    let mut out = Vec::with_capacity(seq.len() + 1);
    out.extend_from_slice(seq);
    out.push(end);
    out
}

pub fn wrap_start_end(seq: &[Token], start: Token, end: Token) -> Vec<Token> {
    let mut out = Vec::with_capacity(seq.len() + 2);
    out.push(start);
    out.extend_from_slice(seq);
    out.push(end);
    out
}

/// Apply `boundary` to `seq`.
///
/// Returns the wrapped sequence and the index scoring should begin at:
/// 1 when a start marker was prepended (the marker only seeds context),
/// otherwise 0.
pub fn wrap(seq: &[Token], boundary: Boundary, start: Token, end: Token) -> (Vec<Token>, usize) {
    match boundary {
        Boundary::Both => (wrap_start_end(seq, start, end), 1),
        Boundary::Start => (wrap_start(seq, start), 1),
        Boundary::End => (wrap_end(seq, end), 0),
        Boundary::None => (seq.to_vec(), 0),
    }
}
