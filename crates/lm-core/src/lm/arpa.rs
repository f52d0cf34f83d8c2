use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug_span, info};

use super::{LanguageModel, LmError, LmState};
use crate::settings::settings;
use crate::token::Token;

/// log10 probability and back-off weight of one n-gram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct NgramWeights {
    pub log_prob: f32,
    pub backoff: f32,
}

/// Katz-style back-off n-gram model read from an ARPA file.
///
/// Probabilities are log10 as stored in the file. Words the model has
/// never seen score as `<unk>` when it exists, otherwise they get the
/// configured `lm.oov_log_prob`.
pub struct BackoffModel {
    pub(super) name: String,
    pub(super) order: usize,
    pub(super) ngrams: HashMap<Box<[Token]>, NgramWeights>,
    /// Number of n-grams per order (index 0 = unigrams).
    pub(super) counts: Vec<usize>,
    pub(super) oov_log_prob: f32,
    start: Token,
    end: Token,
    unk: Option<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Counts,
    Ngrams(usize),
    End,
}

impl BackoffModel {
    /// Assemble a model from already-parsed n-grams.
    pub(super) fn from_parts(
        name: String,
        order: usize,
        ngrams: HashMap<Box<[Token]>, NgramWeights>,
        oov_log_prob: f32,
    ) -> Result<Self, LmError> {
        if order == 0 {
            return Err(LmError::InvalidModel("model has no n-gram sections".into()));
        }
        let mut counts = vec![0usize; order];
        for key in ngrams.keys() {
            match key.len() {
                n @ 1.. if n <= order => counts[n - 1] += 1,
                n => {
                    return Err(LmError::InvalidModel(format!(
                        "{n}-gram in a model of order {order}"
                    )))
                }
            }
        }

        let start = Token::intern("<s>");
        let end = Token::intern("</s>");
        let is_unigram = |t: Token| ngrams.contains_key(std::slice::from_ref(&t));
        if !is_unigram(start) || !is_unigram(end) {
            return Err(LmError::InvalidModel(
                "model must contain <s> and </s> unigrams".into(),
            ));
        }
        let unk = Token::lookup(&settings().lm.unknown_word).filter(|&t| is_unigram(t));

        Ok(Self {
            name,
            order,
            ngrams,
            counts,
            oov_log_prob,
            start,
            end,
            unk,
        })
    }

    /// Parse ARPA text.
    ///
    /// Declared counts in the `\data\` block must match the entries found in
    /// each `\N-grams:` section, and the file must end with `\end\`.
    pub fn from_text(name: &str, text: &str) -> Result<Self, LmError> {
        let mut declared: Vec<usize> = Vec::new();
        let mut parsed: Vec<usize> = Vec::new();
        let mut ngrams: HashMap<Box<[Token]>, NgramWeights> = HashMap::new();
        let mut section = Section::Preamble;

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line == "\\data\\" {
                section = Section::Counts;
                continue;
            }
            if line == "\\end\\" {
                section = Section::End;
                break;
            }
            if let Some(n) = section_order(line) {
                if n == 0 || n > declared.len() {
                    return Err(parse_err(line_no, format!("undeclared section {n}-grams")));
                }
                section = Section::Ngrams(n);
                continue;
            }

            match section {
                // Free text before \data\ is allowed.
                Section::Preamble => {}
                Section::Counts => {
                    let (n, count) = parse_count(line)
                        .ok_or_else(|| parse_err(line_no, format!("bad count line '{line}'")))?;
                    if n != declared.len() + 1 {
                        return Err(parse_err(line_no, format!("unexpected count for order {n}")));
                    }
                    declared.push(count);
                    parsed.push(0);
                }
                Section::Ngrams(n) => {
                    let fields: Vec<&str> = line.split_whitespace().collect();
                    if fields.len() != n + 1 && fields.len() != n + 2 {
                        return Err(parse_err(
                            line_no,
                            format!("expected {} or {} fields, got {}", n + 1, n + 2, fields.len()),
                        ));
                    }
                    let log_prob: f32 = fields[0]
                        .parse()
                        .map_err(|e| parse_err(line_no, format!("log probability: {e}")))?;
                    let backoff: f32 = match fields.get(n + 1) {
                        Some(b) => b
                            .parse()
                            .map_err(|e| parse_err(line_no, format!("back-off weight: {e}")))?,
                        None => 0.0,
                    };
                    let key: Box<[Token]> = fields[1..=n].iter().map(|w| Token::intern(w)).collect();
                    ngrams.insert(key, NgramWeights { log_prob, backoff });
                    parsed[n - 1] += 1;
                }
                Section::End => unreachable!("loop exits on \\end\\"),
            }
        }

        if section != Section::End {
            return Err(LmError::InvalidModel("missing \\end\\ marker".into()));
        }
        for (i, (&want, &got)) in declared.iter().zip(&parsed).enumerate() {
            if want != got {
                return Err(LmError::InvalidModel(format!(
                    "declared {want} {}-grams, found {got}",
                    i + 1
                )));
            }
        }

        Self::from_parts(
            name.to_string(),
            declared.len(),
            ngrams,
            settings().lm.oov_log_prob,
        )
    }

    /// Read an ARPA file; the model is named after the file stem.
    pub fn load_arpa(path: &Path) -> Result<Self, LmError> {
        let _span = debug_span!("arpa_load", path = %path.display()).entered();
        let text = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let model = Self::from_text(&name, &text)?;
        info!(order = model.order, counts = ?model.counts, "loaded ARPA model");
        Ok(model)
    }

    /// Override the score charged for words with no unigram entry.
    pub fn with_oov_log_prob(mut self, log_prob: f32) -> Self {
        self.oov_log_prob = log_prob;
        self
    }

    /// Number of n-grams per order, unigrams first.
    pub fn ngram_counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn contains(&self, ngram: &[Token]) -> bool {
        self.ngrams.contains_key(ngram)
    }

    /// Map a word the model does not know to `<unk>` when available.
    fn in_vocab(&self, t: Token) -> Token {
        if self.ngrams.contains_key(std::slice::from_ref(&t)) {
            t
        } else {
            self.unk.unwrap_or(t)
        }
    }

    /// log10 P(last | preceding) with back-off through shorter histories.
    fn ngram_log_prob(&self, ngram: &[Token]) -> f32 {
        let mapped: Vec<Token> = ngram.iter().map(|&t| self.in_vocab(t)).collect();
        let last = mapped.len() - 1;
        let mut backoff = 0.0f32;
        let mut lo = 0;
        loop {
            if let Some(w) = self.ngrams.get(&mapped[lo..]) {
                let p = backoff + w.log_prob;
                return if p.is_finite() { p } else { self.oov_log_prob };
            }
            if lo == last {
                return backoff + self.oov_log_prob;
            }
            if let Some(h) = self.ngrams.get(&mapped[lo..last]) {
                backoff += h.backoff;
            }
            lo += 1;
        }
    }
}

impl LanguageModel for BackoffModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> usize {
        self.order
    }

    fn start_token(&self) -> Token {
        self.start
    }

    fn end_token(&self) -> Token {
        self.end
    }

    fn score(&self, sequence: &[Token], start_index: usize, prior: Option<&LmState>) -> LmState {
        let context = prior.map(LmState::context).unwrap_or(&[]);
        if sequence.is_empty() {
            return LmState::new(0.0, context);
        }

        let mut seq = Vec::with_capacity(context.len() + sequence.len());
        seq.extend_from_slice(context);
        seq.extend_from_slice(sequence);
        let first = (context.len() + start_index).min(seq.len());

        let mut total = 0.0f64;
        for pos in first..seq.len() {
            let lo = (pos + 1).saturating_sub(self.order);
            total += self.ngram_log_prob(&seq[lo..=pos]) as f64;
        }

        let keep = seq.len().saturating_sub(self.order - 1);
        LmState::new(total, &seq[keep..])
    }
}

fn parse_err(line: usize, reason: String) -> LmError {
    LmError::Parse { line, reason }
}

/// `\3-grams:` → 3
fn section_order(line: &str) -> Option<usize> {
    line.strip_prefix('\\')?
        .strip_suffix("-grams:")?
        .parse()
        .ok()
}

/// `ngram 2=145` → (2, 145)
fn parse_count(line: &str) -> Option<(usize, usize)> {
    let rest = line.strip_prefix("ngram")?.trim();
    let (n, count) = rest.split_once('=')?;
    Some((n.trim().parse().ok()?, count.trim().parse().ok()?))
}
